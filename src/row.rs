//! Fixed-width row encoding.
//!
//! ```text
//! +--------+----------------+-----------------+
//! | id u32 | username [32]  | email [255]     |
//! | LE     | NUL padded     | NUL padded      |
//! +--------+----------------+-----------------+
//! 0        4                36                291
//! ```

use std::fmt;

use crate::{EMAIL_OFFSET, EMAIL_SIZE, ID_OFFSET, ID_SIZE, ROW_SIZE, USERNAME_OFFSET, USERNAME_SIZE};

/// A logical record. Text fields hold raw bytes: decoded rows keep the
/// stored run including its NUL padding, valid UTF-8 or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: Vec<u8>,
    pub email: Vec<u8>,
}

impl Row {
    pub fn new(id: u32, username: impl Into<Vec<u8>>, email: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Username with the trailing NUL padding removed.
    pub fn username_trimmed(&self) -> &[u8] {
        trim_padding(&self.username)
    }

    /// Email with the trailing NUL padding removed.
    pub fn email_trimmed(&self) -> &[u8] {
        trim_padding(&self.email)
    }
}

/// Text is rendered lossily; the row itself is left untouched.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.id,
            String::from_utf8_lossy(self.username_trimmed()),
            String::from_utf8_lossy(self.email_trimmed())
        )
    }
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let len = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &field[..len]
}

/// Copies at most `N` bytes of `text` into a zeroed `N`-byte field.
/// Longer input is cut at the byte level without complaint, even inside
/// a multi-byte character.
pub fn fixed_width<const N: usize>(text: &[u8]) -> [u8; N] {
    let mut field = [0u8; N];
    let len = text.len().min(N);
    field[..len].copy_from_slice(&text[..len]);
    field
}

pub fn encode(row: &Row) -> [u8; ROW_SIZE] {
    let mut buf = [0u8; ROW_SIZE];
    buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&row.id.to_le_bytes());
    buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]
        .copy_from_slice(&fixed_width::<USERNAME_SIZE>(&row.username));
    buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]
        .copy_from_slice(&fixed_width::<EMAIL_SIZE>(&row.email));
    buf
}

/// Never fails: any `ROW_SIZE` bytes form a row.
pub fn decode(buf: &[u8; ROW_SIZE]) -> Row {
    let mut id = [0u8; ID_SIZE];
    id.copy_from_slice(&buf[ID_OFFSET..ID_OFFSET + ID_SIZE]);

    Row {
        id: u32::from_le_bytes(id),
        username: buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].to_vec(),
        email: buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].to_vec(),
    }
}
