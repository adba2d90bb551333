//! Output file naming.

/// Builds `<prefix><zero-padded index><extension>` file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    /// Minimum digit count of the written index.
    pub pad_width: usize,
    /// File extension including the leading dot.
    pub extension: String,
}

impl OutputNaming {
    /// Creates a naming scheme.
    #[must_use]
    pub fn new(pad_width: usize, extension: impl Into<String>) -> Self {
        Self {
            pad_width,
            extension: extension.into(),
        }
    }

    /// Formats the output file name for one captured frame.
    #[must_use]
    pub fn file_name(&self, prefix: &str, index: u64) -> String {
        format!(
            "{prefix}{index:0width$}{ext}",
            width = self.pad_width,
            ext = self.extension
        )
    }
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self::new(1, ".exr")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_padding() {
        let naming = OutputNaming::new(4, ".exr");
        assert_eq!(naming.file_name("out/n_", 7), "out/n_0007.exr");
        assert_eq!(naming.file_name("", 12345), "12345.exr");
    }

    #[test]
    fn test_default_pad_is_one_digit() {
        let naming = OutputNaming::default();
        assert_eq!(naming.file_name("a_", 0), "a_0.exr");
        assert_eq!(naming.file_name("a_", 42), "a_42.exr");
    }
}
