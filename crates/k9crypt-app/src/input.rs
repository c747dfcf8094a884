//! Terminal-agnostic keyboard input and the line editor.

/// Keyboard input abstraction.
///
/// Decouples application logic from terminal libraries so simulation can
/// type into the app without a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key (submit the line).
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Escape key (interrupt the session).
    Esc,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
}

/// Single-line edit buffer with a cursor.
///
/// The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    buffer: String,
    cursor: usize,
}

impl InputState {
    /// Current text.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters from the start.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Apply an editing key. Returns `false` for keys that do not edit.
    pub fn apply(&mut self, key: KeyInput) -> bool {
        match key {
            KeyInput::Char(c) => self.insert(c),
            KeyInput::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset(self.cursor);
                    self.buffer.remove(at);
                }
            },
            KeyInput::Delete => {
                if self.cursor < self.char_len() {
                    let at = self.byte_offset(self.cursor);
                    self.buffer.remove(at);
                }
            },
            KeyInput::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyInput::Right => self.cursor = (self.cursor + 1).min(self.char_len()),
            KeyInput::Home => self.cursor = 0,
            KeyInput::End => self.cursor = self.char_len(),
            KeyInput::Enter | KeyInput::Esc => return false,
        }
        true
    }

    /// Insert `c` at the cursor.
    pub fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
    }

    /// Take the text, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputState {
        let mut input = InputState::default();
        for c in text.chars() {
            input.apply(KeyInput::Char(c));
        }
        input
    }

    #[test]
    fn edits_in_the_middle() {
        let mut input = typed("helo");
        input.apply(KeyInput::Left);
        input.apply(KeyInput::Char('l'));
        assert_eq!(input.as_str(), "hello");
        assert_eq!(input.cursor(), 4);

        input.apply(KeyInput::Home);
        input.apply(KeyInput::Delete);
        input.apply(KeyInput::End);
        input.apply(KeyInput::Backspace);
        assert_eq!(input.as_str(), "ell");
    }

    #[test]
    fn multibyte_characters_are_single_positions() {
        let mut input = typed("héllo");
        input.apply(KeyInput::Home);
        input.apply(KeyInput::Right);
        input.apply(KeyInput::Delete);
        assert_eq!(input.as_str(), "hllo");
    }

    #[test]
    fn take_clears_buffer_and_cursor() {
        let mut input = typed("bye");
        assert_eq!(input.take(), "bye");
        assert!(input.is_empty());
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = typed("ab");
        input.apply(KeyInput::Right);
        input.apply(KeyInput::Right);
        assert_eq!(input.cursor(), 2);
        input.apply(KeyInput::Home);
        input.apply(KeyInput::Left);
        input.apply(KeyInput::Backspace);
        assert_eq!(input.cursor(), 0);
        assert_eq!(input.as_str(), "ab");
    }
}
