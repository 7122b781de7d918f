use thiserror::Error;

/// Problems in the page layout file
#[derive(Error, Debug, PartialEq)]
pub enum LayoutError {
    #[error("Duplicate item id {0}")]
    DuplicateItem(u32),

    #[error("Item {0} has an empty name")]
    EmptyName(u32),

    #[error("Item {item} has an unusable quick step {step}")]
    InvalidStep { item: u32, step: f64 },

    #[error("No stock-change reasons configured")]
    NoReasons,
}

/// Client-side hints raised when a stock form is submitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Enter a quantity")]
    QuantityMissing,

    #[error("Enter a quantity other than 0")]
    QuantityZero,

    #[error("Quantity must be a number")]
    QuantityInvalid,

    #[error("Select a reason")]
    ReasonMissing,
}
