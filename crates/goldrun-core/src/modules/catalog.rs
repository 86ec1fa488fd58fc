use crate::domain::{Fixture, HarnessError, HarnessResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("input directory '{}' does not exist", path.display())]
    MissingDirectory { path: PathBuf },
    #[error("failed to read input directory '{}': {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<CatalogError> for HarnessError {
    fn from(error: CatalogError) -> Self {
        let message = error.to_string();
        match error {
            CatalogError::MissingDirectory { .. } => {
                HarnessError::input_validation("INPUT.FIXTURE_DIRECTORY", message)
            }
            CatalogError::ReadDirectory { .. } => {
                HarnessError::io_system("IO.FIXTURE_DIRECTORY", message)
            }
        }
    }
}

/// Enumerates `<digits>.<extension>` files in `input_dir` in ascending
/// numeric order. Expected paths are not checked for existence here.
pub fn load_fixtures(
    input_dir: &Path,
    output_dir: &Path,
    extension: &str,
) -> HarnessResult<Vec<Fixture>> {
    let fixtures = scan_input_directory(input_dir, output_dir, extension)?;
    tracing::debug!(
        input_dir = %input_dir.display(),
        count = fixtures.len(),
        "fixture catalog loaded"
    );
    Ok(fixtures)
}

fn scan_input_directory(
    input_dir: &Path,
    output_dir: &Path,
    extension: &str,
) -> Result<Vec<Fixture>, CatalogError> {
    if !input_dir.is_dir() {
        return Err(CatalogError::MissingDirectory {
            path: input_dir.to_path_buf(),
        });
    }

    let directory = fs::read_dir(input_dir).map_err(|source| CatalogError::ReadDirectory {
        path: input_dir.to_path_buf(),
        source,
    })?;

    let mut fixtures = Vec::new();
    for entry in directory {
        let entry = entry.map_err(|source| CatalogError::ReadDirectory {
            path: input_dir.to_path_buf(),
            source,
        })?;
        let entry_path = entry.path();
        if !entry_path.is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some(number) = parse_fixture_number(&file_name, extension) else {
            tracing::trace!(file_name = %file_name, "skipping non-fixture file");
            continue;
        };

        let expected_path = output_dir.join(&file_name);
        fixtures.push(Fixture::new(number, file_name, entry_path, expected_path));
    }

    fixtures.sort_by(|a, b| {
        a.number
            .cmp(&b.number)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
    Ok(fixtures)
}

/// Returns the fixture number for names of the form `<digits>.<extension>`.
/// Leading zeros are allowed; anything else (including numbers that do not
/// fit in a `u64`) is not a fixture.
pub fn parse_fixture_number(file_name: &str, extension: &str) -> Option<u64> {
    let stem = file_name
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
