use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchdogError {
    #[error("Failed to open pseudo-terminal: {0}")]
    PtyOpen(String),

    #[error("Failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Provisioning process has no pid")]
    NoPid,

    #[error("Failed to signal provisioning process: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Another watchdog instance holds the lock at {0}")]
    AlreadyRunning(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WatchdogError>;
