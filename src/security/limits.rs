/// Upper bound on the size of a single request or message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeValidator {
    max_size: usize,
}

impl SizeValidator {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    pub fn validate_size(&self, size: usize) -> Result<(), SizeError> {
        if size > self.max_size {
            Err(SizeError::TooLarge {
                actual: size,
                max: self.max_size,
            })
        } else {
            Ok(())
        }
    }

    /// Checks that `buffered + incoming` bytes still fit, without overflowing
    pub fn validate_growth(&self, buffered: usize, incoming: usize) -> Result<(), SizeError> {
        self.validate_size(buffered.saturating_add(incoming))
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SizeError {
    #[error("Request too large: {actual} bytes, maximum allowed: {max} bytes")]
    TooLarge { actual: usize, max: usize },
    #[error("Too many fields: maximum allowed: {max}")]
    TooManyFields { max: usize },
}
