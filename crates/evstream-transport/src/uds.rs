use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 elsewhere.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// Listening Unix domain socket that hands out [`IpcStream`]s.
///
/// The socket file is removed again when the listener is dropped.
#[derive(Debug)]
pub struct UnixSocketListener {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixSocketListener {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    /// Bind and listen at `path`, replacing a stale socket file if present.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_path_len(&path)?;

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| bind_error(&path, e))?;
            if !metadata.file_type().is_socket() {
                return Err(bind_error(
                    &path,
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| bind_error(&path, e))?;
        }

        let listener = UnixListener::bind(&path).map_err(|e| bind_error(&path, e))?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(|e| bind_error(&path, e))?;

        info!(?path, "listening on unix domain socket");
        Ok(Self { listener, path })
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        Ok(IpcStream::from_unix(stream))
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        let is_socket = std::fs::symlink_metadata(&self.path)
            .map(|m| m.file_type().is_socket())
            .unwrap_or(false);
        if is_socket {
            debug!(path = ?self.path, "cleaning up socket file");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Connect to a listening Unix domain socket (blocking).
pub fn connect_unix(path: impl AsRef<Path>) -> Result<IpcStream> {
    let path = path.as_ref();
    check_path_len(path)?;
    let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(?path, "connected to unix domain socket");
    Ok(IpcStream::from_unix(stream))
}

fn check_path_len(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}

fn bind_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Bind {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("evstream-uds-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("basic");
        let sock_path = dir.join("t.sock");

        let listener = UnixSocketListener::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut client = connect_unix(&path_clone).unwrap();
            client.write_all(b"audio").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"audio");
        handle.join().unwrap();

        drop(listener);
        assert!(!sock_path.exists(), "socket file should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        assert!(matches!(
            UnixSocketListener::bind(&long_path),
            Err(TransportError::PathTooLong { .. })
        ));
        assert!(matches!(
            connect_unix(&long_path),
            Err(TransportError::PathTooLong { .. })
        ));
    }

    #[test]
    fn socket_mode_is_owner_only() {
        let dir = temp_dir("perms");
        let sock_path = dir.join("p.sock");

        let listener = UnixSocketListener::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rebind_replaces_stale_socket() {
        let dir = temp_dir("stale");
        let sock_path = dir.join("s.sock");

        let first = UnixSocketListener::bind(&sock_path).unwrap();
        std::mem::forget(first);
        let second = UnixSocketListener::bind(&sock_path);
        assert!(second.is_ok());

        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_refuses_regular_file() {
        let dir = temp_dir("file");
        let sock_path = dir.join("plain.sock");
        std::fs::write(&sock_path, b"not a socket").unwrap();

        let result = UnixSocketListener::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let dir = temp_dir("missing");
        let result = connect_unix(dir.join("nobody.sock"));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
