use std::path::Path;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
///
/// `RUST_LOG` overrides the default `atrium=info` filter; `LOG_FORMAT=json`
/// switches to structured output.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("atrium=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Upload name for a local file: an explicit override, else the file name.
pub fn upload_name(path: &Path, name_override: Option<&str>) -> String {
    match name_override {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_name_prefers_override() {
        assert_eq!(upload_name(Path::new("/tmp/a.png"), None), "a.png");
        assert_eq!(upload_name(Path::new("/tmp/a.png"), Some("Hero.png")), "Hero.png");
        assert_eq!(upload_name(Path::new("/"), None), "");
    }
}
