//! External XML generator invocation.
//!
//! Each written YAML record is handed to a configured command (e.g. an
//! MCF-to-ISO 19139 converter) as its last argument.

use std::path::Path;
use std::process::{Command, Stdio};

use erddap_iso_shared::{GeneratorConfig, HarvestError, Result};
use tracing::{debug, info, warn};

/// Run the generator for one YAML file.
pub fn generate(config: &GeneratorConfig, yaml_path: &Path) -> Result<()> {
    debug!(cmd = %config.command, path = %yaml_path.display(), "running XML generator");

    let output = Command::new(&config.command)
        .args(&config.args)
        .arg(yaml_path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            HarvestError::Generator(format!(
                "failed to spawn generator: {e}. Is `{}` installed?",
                config.command
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HarvestError::Generator(format!(
            "generator exited with status {} for {}: {}",
            output.status.code().unwrap_or(-1),
            yaml_path.display(),
            stderr.trim()
        )));
    }

    Ok(())
}

/// Run the generator over every path; failures are logged and skipped.
///
/// Returns how many files converted successfully.
pub fn generate_all(config: &GeneratorConfig, paths: &[impl AsRef<Path>]) -> usize {
    let mut converted = 0;

    for path in paths {
        match generate(config, path.as_ref()) {
            Ok(()) => converted += 1,
            Err(e) => warn!(error = %e, "XML generation failed, continuing"),
        }
    }

    info!(converted, total = paths.len(), "XML generation complete");
    converted
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> GeneratorConfig {
        GeneratorConfig {
            command: "sh".into(),
            args: vec!["-c".into(), script.into(), "generator".into()],
        }
    }

    #[test]
    fn yaml_path_is_last_argument() {
        let tmp = tempfile::tempdir().unwrap();
        let yaml = tmp.path().join("buoy.yml");
        std::fs::write(&yaml, "x: 1\n").unwrap();

        // $1 is the appended path; copy it next to itself with an .xml suffix
        let config = shell(r#"cp "$1" "${1%.yml}.xml""#);
        generate(&config, &yaml).unwrap();
        assert!(tmp.path().join("buoy.xml").exists());
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let err = generate(&shell("echo broken >&2; exit 3"), Path::new("a.yml")).unwrap_err();
        match err {
            HarvestError::Generator(msg) => {
                assert!(msg.contains("status 3"));
                assert!(msg.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_command_is_an_error() {
        let config = GeneratorConfig {
            command: "definitely-not-a-real-generator".into(),
            args: vec![],
        };
        assert!(matches!(
            generate(&config, Path::new("a.yml")),
            Err(HarvestError::Generator(_))
        ));
    }

    #[test]
    fn batch_continues_past_failures() {
        let config = shell(r#"test "$1" != "bad.yml""#);
        let paths = ["good.yml", "bad.yml", "other.yml"];
        assert_eq!(generate_all(&config, &paths), 2);
    }
}
