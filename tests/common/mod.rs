#![allow(dead_code)]

use std::fs;
use std::io::{BufRead as _, BufReader, Write as _};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use tomcat_launcher_lib::config::AppConfig;
use tomcat_launcher_lib::paths::AppPaths;

pub const FIXTURE_TOP: &str = "apache-tomcat-9.0.50";

/// Files shipped by the fixture distribution, relative to its top-level folder.
pub const DISTRIBUTION_FILES: &[(&str, &str)] = &[
    ("bin/startup.sh", "#!/bin/sh\nexit 0\n"),
    ("bin/shutdown.sh", "#!/bin/sh\nexit 0\n"),
    ("bin/catalina.sh", "#!/bin/sh\nexit 0\n"),
    ("bin/setenv.sh", "# site overrides"),
    ("bin/startup.bat", "@echo off\r\n"),
    ("bin/shutdown.bat", "@echo off\r\n"),
    ("bin/catalina.bat", "@echo off\r\n"),
    ("bin/setenv.bat", "rem site overrides"),
    ("conf/server.xml", "<Server port=\"8005\"/>\n"),
    ("conf/context.xml", "<Context/>\n"),
    ("webapps/ROOT/index.jsp", "ok\n"),
    ("webapps/docs.war", "war"),
];

pub fn temp_paths() -> (TempDir, AppPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path().join("data"));
    paths.ensure_data_dirs().unwrap();
    (dir, paths)
}

/// Config with tight polling so lifecycle tests finish quickly.
pub fn fast_config(start_timeout_secs: u64, stop_timeout_secs: u64) -> AppConfig {
    AppConfig {
        poll_interval_ms: 50,
        start_timeout_secs,
        stop_timeout_secs,
        ..AppConfig::default()
    }
}

/// Lay out an already-installed server with empty conf, logs and webapps.
pub fn seed_server(paths: &AppPaths, name: &str) -> PathBuf {
    let root = paths.instance_dir(name);
    for sub in ["bin", "conf", "logs", "webapps"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    root
}

pub fn write_marker(paths: &AppPaths, name: &str, pid: u32) {
    fs::write(paths.pid_file(name), format!("{}\n", pid)).unwrap();
}

pub fn write_zip_distribution(path: &Path) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);

    zip.add_directory(format!("{}/", FIXTURE_TOP), options).unwrap();
    for (rel, content) in DISTRIBUTION_FILES {
        zip.start_file(format!("{}/{}", FIXTURE_TOP, rel), options)
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn write_tar_gz_distribution(path: &Path) {
    let file = fs::File::create(path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (rel, content) in DISTRIBUTION_FILES {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", FIXTURE_TOP, rel), content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Launchers that behave like the real ones: startup backgrounds a long-lived
/// process and records its pid, shutdown kills it and removes the marker.
#[cfg(unix)]
pub fn write_fake_launchers(paths: &AppPaths, name: &str) {
    use std::os::unix::fs::PermissionsExt as _;

    let bin = paths.instance_bin_dir(name);
    let scripts = [
        (
            "startup.sh",
            "#!/bin/sh\nsleep 30 >/dev/null 2>&1 &\necho $! > ../logs/tomcat.pid\n",
        ),
        (
            "shutdown.sh",
            "#!/bin/sh\nif [ -f ../logs/tomcat.pid ]; then\n  kill \"$(cat ../logs/tomcat.pid)\" 2>/dev/null\n  rm -f ../logs/tomcat.pid\nfi\n",
        ),
        ("catalina.sh", "#!/bin/sh\nexit 0\n"),
    ];
    for (file, body) in scripts {
        let path = bin.join(file);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// Startup launcher that exits without ever writing the pid marker.
#[cfg(unix)]
pub fn write_silent_startup(paths: &AppPaths, name: &str) {
    use std::os::unix::fs::PermissionsExt as _;

    let path = paths.instance_bin_dir(name).join("startup.sh");
    fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Minimal HTTP/1.1 server for the archive mirror. Unknown paths answer 404.
pub struct MirrorServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
}

impl MirrorServer {
    pub fn start(routes: Vec<(String, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" || line == "\n" => break,
                        Ok(_) => {}
                    }
                }

                counter.fetch_add(1, Ordering::SeqCst);
                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = routes
                    .iter()
                    .find(|(route, _)| route == path)
                    .map(|(_, body)| ("200 OK", body.clone()))
                    .unwrap_or(("404 Not Found", b"missing".to_vec()));

                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
                let _ = stream.flush();
            }
        });

        Self {
            base_url: format!("http://{}/tomcat-", addr),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
