//! Structured field errors, modelled after the Kubernetes API machinery field errors so they can
//! be reported to users unchanged.

use std::{
    fmt::{Display, Write},
    ops::Deref,
};

use serde_json::Value;

/// A path to a field inside an object, e.g. `spec.providerConfig.machineImages[0].versions[1]`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

impl FieldPath {
    /// Creates a path starting at `name`. The name may itself contain dots.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Field(name.into())],
        }
    }

    /// Creates a path from a list of field names.
    pub fn from_fields<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            segments: names
                .into_iter()
                .map(|name| Segment::Field(name.to_owned()))
                .collect(),
        }
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        self.with(Segment::Field(name.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(Segment::Index(index))
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(Segment::Key(key.into()))
    }

    fn with(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// The kind of problem a [`FieldError`] reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum ErrorKind {
    /// A mandatory field or sub-document is missing.
    #[strum(to_string = "Required value")]
    Required,

    /// A present value fails a format, range or consistency rule.
    #[strum(to_string = "Invalid value")]
    Invalid,

    /// A value is not permitted in this context.
    #[strum(to_string = "Forbidden")]
    Forbidden,

    /// A uniqueness constraint is violated.
    #[strum(to_string = "Duplicate value")]
    Duplicate,

    /// A value is not one of the accepted values.
    #[strum(to_string = "Unsupported value")]
    NotSupported,

    /// Validation itself failed unexpectedly.
    #[strum(to_string = "Internal error")]
    InternalError,
}

/// A single problem found while validating a field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub path: FieldPath,

    /// The rejected value, for kinds which report one.
    pub value: Option<Value>,
    pub detail: String,

    /// Accepted alternatives, sorted. Only set for [`ErrorKind::NotSupported`].
    pub supported_values: Vec<String>,
}

impl FieldError {
    fn new(kind: ErrorKind, path: &FieldPath, value: Option<Value>, detail: String) -> Self {
        Self {
            kind,
            path: path.clone(),
            value,
            detail,
            supported_values: Vec::new(),
        }
    }

    pub fn required(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Required, path, None, detail.into())
    }

    pub fn invalid(path: &FieldPath, value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, path, Some(value.into()), detail.into())
    }

    pub fn forbidden(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, path, None, detail.into())
    }

    pub fn duplicate(path: &FieldPath, value: impl Into<Value>) -> Self {
        Self::new(ErrorKind::Duplicate, path, Some(value.into()), String::new())
    }

    /// Reports `value` as unsupported. `supported_values` is sorted and deduplicated.
    pub fn not_supported<S: Into<String>>(
        path: &FieldPath,
        value: impl Into<Value>,
        supported_values: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut supported_values: Vec<String> =
            supported_values.into_iter().map(Into::into).collect();
        supported_values.sort();
        supported_values.dedup();

        let mut error = Self::new(ErrorKind::NotSupported, path, Some(value.into()), String::new());
        error.supported_values = supported_values;
        error
    }

    pub fn internal_error(path: &FieldPath, error: &dyn std::error::Error) -> Self {
        Self::new(ErrorKind::InternalError, path, None, error.to_string())
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{path}: {kind}", path = self.path, kind = self.kind)?;
        if let Some(value) = &self.value {
            write!(f, ": {value}")?;
        }

        if self.kind == ErrorKind::NotSupported {
            f.write_str(": supported values: ")?;
            for (i, supported) in self.supported_values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{supported:?}")?;
            }
        } else if !self.detail.is_empty() {
            write!(f, ": {detail}", detail = self.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}

/// All problems found during a validation pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Returns [`Ok`] if no errors were collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl Deref for ErrorList {
    type Target = [FieldError];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Extend<FieldError> for ErrorList {
    fn extend<T: IntoIterator<Item = FieldError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<T: IntoIterator<Item = FieldError>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorList {
    type IntoIter = std::vec::IntoIter<FieldError>;
    type Item = FieldError;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<FieldError> for ErrorList {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl Display for ErrorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.len() > 1 {
            f.write_char('[')?;
        }
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        if self.0.len() > 1 {
            f.write_char(']')?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn path_rendering() {
        let path = FieldPath::new("spec.providerConfig")
            .child("machineImages")
            .index(0)
            .child("versions")
            .index(1);

        assert_eq!(
            path.to_string(),
            "spec.providerConfig.machineImages[0].versions[1]"
        );
        assert_eq!(
            FieldPath::from_fields(["spec", "labels"]).key("foo").to_string(),
            "spec.labels[foo]"
        );
    }

    #[rstest]
    #[case(
        FieldError::required(&FieldPath::new("name"), "must provide a name"),
        "name: Required value: must provide a name"
    )]
    #[case(
        FieldError::invalid(&FieldPath::new("id"), "x", "must be a valid UUID"),
        "id: Invalid value: \"x\": must be a valid UUID"
    )]
    #[case(
        FieldError::duplicate(&FieldPath::new("names").index(1), "a"),
        "names[1]: Duplicate value: \"a\""
    )]
    #[case(
        FieldError::not_supported(&FieldPath::new("pool"), "c", ["b", "a", "b"]),
        "pool: Unsupported value: \"c\": supported values: \"a\", \"b\""
    )]
    fn error_rendering(#[case] error: FieldError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn list_rendering_and_result() {
        assert_eq!(ErrorList::new().into_result(), Ok(()));

        let errors: ErrorList = [
            FieldError::forbidden(&FieldPath::new("a"), "not allowed"),
            FieldError::required(&FieldPath::new("b"), "missing"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            errors.to_string(),
            "[a: Forbidden: not allowed, b: Required value: missing]"
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn errors_and_specs_are_comparable() {
        fn assert_eq_impl<T: Eq>() {}
        assert_eq_impl::<FieldError>();
        assert_eq_impl::<ErrorList>();
        assert_eq_impl::<crate::apis::v1beta1::CloudProfileSpec>();

        let errors: ErrorList = [FieldError::required(&FieldPath::new("a"), "missing")]
            .into_iter()
            .collect();
        assert_eq!(errors, errors.clone());
    }
}
