use std::process::ExitCode;

fn main() -> ExitCode {
    tomcat_launcher_lib::run()
}
