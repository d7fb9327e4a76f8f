use std::sync::Arc;

/// Source text for a parsed script with precomputed line starts.
#[derive(Debug, Clone)]
pub struct SourceText {
  pub name: Arc<str>,
  pub text: Arc<str>,
  line_starts: Vec<u32>,
}

impl SourceText {
  pub fn new(name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
    let name = name.into();
    let text = text.into();
    let mut line_starts = vec![0u32];

    for (idx, ch) in text.char_indices() {
      if ch == '\n' {
        let next = (idx + 1).min(text.len());
        if let Ok(next) = u32::try_from(next) {
          line_starts.push(next);
        }
      }
    }

    Self {
      name,
      text,
      line_starts,
    }
  }

  /// Convert a UTF-8 byte offset into 1-based `(line, col)` numbers.
  ///
  /// Offsets that fall outside the text are clamped; offsets that fall inside a
  /// UTF-8 sequence are clamped backwards to the nearest valid char boundary.
  pub fn line_col(&self, offset: usize) -> (u32, u32) {
    let mut offset = offset.min(self.text.len());
    while offset > 0 && !self.text.is_char_boundary(offset) {
      offset -= 1;
    }

    let offset_u32 = u32::try_from(offset).unwrap_or(u32::MAX);
    let line_idx = match self.line_starts.binary_search(&offset_u32) {
      Ok(idx) => idx,
      Err(0) => 0,
      Err(idx) => idx - 1,
    };

    let line_start = *self
      .line_starts
      .get(line_idx)
      .unwrap_or(&u32::try_from(self.text.len()).unwrap_or(u32::MAX)) as usize;

    let slice = &self.text[line_start..offset];
    let col0 = slice.chars().count() as u32;
    (line_idx as u32 + 1, col0 + 1)
  }

  pub fn line_of(&self, offset: usize) -> u32 {
    self.line_col(offset).0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn computes_line_and_column() {
    let source = SourceText::new("t.js", "ab\ncd\n\nef");
    assert_eq!(source.line_col(0), (1, 1));
    assert_eq!(source.line_col(1), (1, 2));
    assert_eq!(source.line_col(3), (2, 1));
    assert_eq!(source.line_col(6), (3, 1));
    assert_eq!(source.line_col(7), (4, 1));
    // Clamped past the end.
    assert_eq!(source.line_col(100), (4, 3));
  }
}
