/// Stable error codes shared by the CLI exit status and JSONL events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ValidationError = 3,
    ConfigError = 4,
    DependencyError = 11,
    CircularDependency = 12,
    BackendError = 20,
    Cancelled = 31,
    NetworkError = 40,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
