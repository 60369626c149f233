use std::{
    fs,
    path::{Path, PathBuf},
};

use provider_openstack::admission::Resource;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read manifest file {}", path.display()))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse document {index} of {}", path.display()))]
    ParseDocument {
        source: serde_yaml::Error,
        path: PathBuf,
        index: usize,
    },
}

/// Loads all resources from a multi-document YAML file. Empty documents are skipped.
#[instrument]
pub fn load(path: &Path) -> Result<Vec<Resource>, Error> {
    let contents = fs::read_to_string(path).context(ReadFileSnafu { path })?;
    let resources = parse(&contents, path)?;

    debug!(count = resources.len(), "loaded resources");
    Ok(resources)
}

/// Loads the resources of all given files, in order.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<Resource>, Error> {
    let mut resources = Vec::new();
    for path in paths {
        resources.extend(load(path)?);
    }
    Ok(resources)
}

fn parse(contents: &str, path: &Path) -> Result<Vec<Resource>, Error> {
    let mut resources = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(contents).enumerate() {
        let value =
            serde_yaml::Value::deserialize(document).context(ParseDocumentSnafu { path, index })?;
        if value.is_null() {
            continue;
        }
        resources.push(serde_yaml::from_value(value).context(ParseDocumentSnafu { path, index })?);
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use indoc::indoc;

    use super::*;

    #[test]
    fn loads_all_documents() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            indoc! {"
                ---
                apiVersion: v1
                kind: Secret
                metadata:
                  name: openstack
                  namespace: garden-dev
                ---
                apiVersion: core.gardener.cloud/v1beta1
                kind: SecretBinding
                metadata:
                  name: openstack
                  namespace: garden-dev
                secretRef:
                  name: openstack
                ---
            "}
            .as_bytes(),
        )
        .expect("write manifest");

        let resources = load(file.path()).expect("manifest must load");
        let kinds: Vec<_> = resources.iter().map(Resource::kind).collect();
        assert_eq!(kinds, ["Secret", "SecretBinding"]);
    }

    #[test]
    fn reports_the_broken_document() {
        let error = parse(
            indoc! {"
                apiVersion: v1
                kind: Secret
                metadata:
                  name: openstack
                ---
                kind: Unknown
            "},
            Path::new("manifest.yaml"),
        )
        .expect_err("unknown kinds must be rejected");

        assert!(matches!(error, Error::ParseDocument { index: 1, .. }));
    }

    #[test]
    fn missing_files_are_reported() {
        let error = load(Path::new("/does/not/exist.yaml")).expect_err("file does not exist");
        assert!(matches!(error, Error::ReadFile { .. }));
    }
}
