//! Launcher script naming for the host platform.

pub const STARTUP_SCRIPT: &str = "startup";
pub const SHUTDOWN_SCRIPT: &str = "shutdown";
pub const CATALINA_SCRIPT: &str = "catalina";
pub const SETENV_SCRIPT: &str = "setenv";

/// Launchers that must be executable after installation.
pub const LAUNCHER_SCRIPTS: [&str; 3] = [STARTUP_SCRIPT, SHUTDOWN_SCRIPT, CATALINA_SCRIPT];

/// Script extension used by the bundled launchers on this platform.
pub fn script_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        "bat"
    } else {
        "sh"
    }
}

pub fn script_file(stem: &str) -> String {
    format!("{}.{}", stem, script_extension())
}

/// Lines appended to the environment script so the server writes its PID marker
/// and console log to known locations and listens for a debugger.
pub fn env_override_lines(debug_port: u16) -> [String; 3] {
    let jdwp = format!(
        "-Xdebug -Xrunjdwp:transport=dt_socket,server=y,suspend=n,address={}",
        debug_port
    );
    if cfg!(target_os = "windows") {
        [
            r#"set "CATALINA_PID=%CATALINA_BASE%\logs\tomcat.pid""#.to_string(),
            r#"set "CATALINA_OUT=%CATALINA_BASE%\logs\catalina.log""#.to_string(),
            format!(r#"set "JAVA_OPTS=%JAVA_OPTS% {}""#, jdwp),
        ]
    } else {
        [
            r#"CATALINA_PID="$CATALINA_BASE/logs/tomcat.pid""#.to_string(),
            r#"CATALINA_OUT="$CATALINA_BASE/logs/catalina.log""#.to_string(),
            format!(r#"export JAVA_OPTS="$JAVA_OPTS {}""#, jdwp),
        ]
    }
}
