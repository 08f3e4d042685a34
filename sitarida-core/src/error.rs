/// Errors produced by the `sitarida-core` crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A value could not be read as a plain decimal number.
    #[error("Nilai desimal tidak valid: {raw}")]
    InvalidDecimal { raw: String },

    /// A value could not be read as a whole number.
    #[error("{field} harus berupa bilangan bulat")]
    InvalidInteger { field: String },

    /// A value is not one of the accepted enum variants.
    #[error("{field} tidak valid: {raw}")]
    InvalidEnum { field: String, raw: String },

    /// A year is not a 4-digit number in the accepted range.
    #[error("tahun tidak valid: {raw}")]
    InvalidYear { raw: String },
}
