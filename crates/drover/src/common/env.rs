use crate::rm::{ArtifactReference, Visibility};

macro_rules! create_drover_env {
    ($name: literal) => {
        concat!("DROVER_", $name)
    };
}

/// Environment contract between the submitting client and the in-cluster
/// coordinator: where the staged artifact lives and its expected metadata.
pub const DROVER_ARTIFACT_PATH: &str = create_drover_env!("ARTIFACT_PATH");
pub const DROVER_ARTIFACT_LENGTH: &str = create_drover_env!("ARTIFACT_LENGTH");
pub const DROVER_ARTIFACT_TIMESTAMP: &str = create_drover_env!("ARTIFACT_TIMESTAMP");

/// Reads the staged artifact reference from the process environment.
///
/// Returns `Ok(None)` when no artifact path is set. When a non-empty path is
/// set, the length and timestamp must both be present and positive.
pub fn artifact_from_env() -> crate::Result<Option<ArtifactReference>> {
    artifact_from_lookup(|key| std::env::var(key).ok())
}

fn artifact_from_lookup<F: Fn(&str) -> Option<String>>(
    get: F,
) -> crate::Result<Option<ArtifactReference>> {
    let path = match get(DROVER_ARTIFACT_PATH) {
        Some(path) if !path.is_empty() => path,
        _ => return Ok(None),
    };

    let length = parse_positive(get(DROVER_ARTIFACT_LENGTH), DROVER_ARTIFACT_LENGTH)?;
    let timestamp = parse_positive(get(DROVER_ARTIFACT_TIMESTAMP), DROVER_ARTIFACT_TIMESTAMP)?;

    Ok(Some(ArtifactReference {
        uri: path,
        size_bytes: length,
        timestamp_ms: timestamp,
        visibility: Visibility::Public,
    }))
}

fn parse_positive(value: Option<String>, key: &str) -> crate::Result<u64> {
    let value = value.ok_or_else(|| {
        crate::Error::InvalidInput(format!("{key} is not set in the environment"))
    })?;
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(crate::Error::InvalidInput(format!(
            "Illegal value `{value}` for {key} in the environment"
        ))),
    }
}
