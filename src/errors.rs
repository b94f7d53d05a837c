#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The unit cell can not accommodate the requested cutoff: some cell
    /// height is smaller than twice the cutoff, breaking the minimum image
    /// convention; or the cell matrix is not invertible.
    InvalidCell(String),
    /// The cutoff was zero, negative, or not finite. The string contains the
    /// offending value.
    CutoffNotPositive(String),
    /// An explicit unit cell was supplied for a system that was created as
    /// non-periodic. Non-periodic boxes are always derived from the point
    /// coordinates themselves.
    NonPeriodicWithCellOverride,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidCell(e) => write!(f, "invalid unit cell: {}", e),
            Error::CutoffNotPositive(e) => {
                write!(f, "cutoff must be positive and finite, got {}", e)
            }
            Error::NonPeriodicWithCellOverride => {
                write!(f, "can not set an explicit unit cell on a non-periodic system")
            }
        }
    }
}

impl std::error::Error for Error {}
