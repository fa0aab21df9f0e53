//! The table: one contiguous buffer of encoded rows plus a row count.

use std::ops::Range;

use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::row::{self, Row};
use crate::{ROW_SIZE, ROWS_PER_PAGE, TABLE_MAX_PAGES, TABLE_MAX_ROWS};

/// Byte range of the slot holding row `row_index`.
///
/// Rows are packed back to back; the page number only feeds the
/// `TABLE_MAX_PAGES` bound.
pub fn slot_range(row_index: usize) -> Result<Range<usize>> {
    let page_index = row_index / ROWS_PER_PAGE;
    if page_index >= TABLE_MAX_PAGES {
        return Err(Error::OutOfBounds { row_index });
    }
    let start = row_index * ROW_SIZE;
    Ok(start..start + ROW_SIZE)
}

/// Invariant: `pages.len() >= num_rows * ROW_SIZE`. The buffer is kept
/// exactly as loaded, so it may end in a partial row or hold more rows
/// than `TABLE_MAX_ROWS`; only the first `TABLE_MAX_ROWS` are addressable.
#[derive(Debug, Default)]
pub struct Table {
    pages: Vec<u8>,
    num_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a table from a persisted buffer, keeping every byte.
    ///
    /// A partial trailing row is not counted and the next insert writes
    /// over it. Rows past `TABLE_MAX_ROWS` are counted and saved back but
    /// never scanned, and the table rejects further inserts.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let num_rows = bytes.len() / ROW_SIZE;
        let remainder = bytes.len() % ROW_SIZE;
        if remainder != 0 {
            warn!(
                len = bytes.len(),
                trailing = remainder,
                "buffer ends in a partial row"
            );
        }
        if num_rows > TABLE_MAX_ROWS {
            warn!(
                rows = num_rows,
                max = TABLE_MAX_ROWS,
                "rows past table capacity will not be scanned"
            );
        }

        Self {
            pages: bytes,
            num_rows,
        }
    }

    /// The backing buffer, exactly as it is persisted.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pages
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.pages.clone()
    }

    pub fn len(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Appends `row` in the slot after the last committed row. Text wider
    /// than its field is truncated. On `TableFull` nothing changes.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        if self.num_rows >= TABLE_MAX_ROWS {
            return Err(Error::TableFull);
        }
        let slot = slot_range(self.num_rows)?;

        self.pages.resize(self.pages.len() + ROW_SIZE, 0);
        self.pages[slot.clone()].copy_from_slice(&row::encode(row));
        self.num_rows += 1;

        debug!(
            row_index = self.num_rows - 1,
            slot_start = slot.start,
            id = row.id,
            "inserted row"
        );
        Ok(())
    }

    /// Decodes every addressable row in insertion order.
    pub fn scan(&self) -> Rows<'_> {
        Rows {
            table: self,
            next: 0,
            end: self.num_rows.min(TABLE_MAX_ROWS),
        }
    }

    fn row_bytes(&self, row_index: usize) -> Result<&[u8; ROW_SIZE]> {
        let slot = slot_range(row_index)?;
        self.pages
            .get(slot)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(Error::OutOfBounds { row_index })
    }
}

/// Iterator returned by [`Table::scan`].
pub struct Rows<'a> {
    table: &'a Table,
    next: usize,
    end: usize,
}

impl Iterator for Rows<'_> {
    type Item = Row;

    /// # Panics
    ///
    /// If a counted row has no slot in the buffer, which `Table` never
    /// allows to happen.
    fn next(&mut self) -> Option<Row> {
        if self.next >= self.end {
            return None;
        }
        match self.table.row_bytes(self.next) {
            Ok(bytes) => {
                self.next += 1;
                Some(row::decode(bytes))
            }
            Err(e) => {
                error!(error = %e, rows = self.table.num_rows, "scan hit a missing slot");
                panic!("table buffer is shorter than its row count: {e}");
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> Row {
        Row::new(i as u32, format!("user{i}"), format!("person{i}@example.com"))
    }

    #[test]
    fn slot_range_packs_rows_tightly() {
        assert_eq!(slot_range(0).unwrap(), 0..ROW_SIZE);
        assert_eq!(slot_range(1).unwrap(), ROW_SIZE..2 * ROW_SIZE);
        // First row of the second page follows the last row of the first.
        assert_eq!(
            slot_range(ROWS_PER_PAGE).unwrap().start,
            ROWS_PER_PAGE * ROW_SIZE
        );
        assert_eq!(
            slot_range(TABLE_MAX_ROWS - 1).unwrap().end,
            TABLE_MAX_ROWS * ROW_SIZE
        );
    }

    #[test]
    fn slot_range_rejects_last_page_overflow() {
        assert_eq!(ROWS_PER_PAGE, 14);
        assert_eq!(TABLE_MAX_ROWS, 1400);
        assert!(matches!(
            slot_range(TABLE_MAX_ROWS),
            Err(Error::OutOfBounds { row_index: 1400 })
        ));
    }

    #[test]
    fn empty_table_scans_nothing() {
        let table = Table::new();
        assert!(table.is_empty());
        assert_eq!(table.scan().count(), 0);
        assert!(table.as_bytes().is_empty());
    }

    #[test]
    fn scan_preserves_insertion_order() {
        let mut table = Table::new();
        table.insert(&Row::new(1, "alice", "alice@example.com")).unwrap();
        table.insert(&Row::new(2, "bob", "bob@example.com")).unwrap();
        table.insert(&Row::new(3, "charlie", "charlie@example.com")).unwrap();

        let rows: Vec<Row> = table.scan().collect();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(rows[2].username_trimmed(), b"charlie");
        assert_eq!(rows[2].email_trimmed(), b"charlie@example.com");

        // Scanning again gives the same rows.
        assert_eq!(table.scan().collect::<Vec<_>>(), rows);
        assert_eq!(table.scan().len(), 3);
    }

    #[test]
    fn insert_grows_buffer_by_one_row() {
        let mut table = Table::new();
        for i in 0..3 {
            table.insert(&sample(i)).unwrap();
            assert_eq!(table.as_bytes().len(), (i + 1) * ROW_SIZE);
        }
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn duplicate_ids_are_allowed() {
        let mut table = Table::new();
        table.insert(&sample(5)).unwrap();
        table.insert(&sample(5)).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn insert_past_capacity_is_table_full() {
        let mut table = Table::new();
        for i in 0..TABLE_MAX_ROWS {
            table.insert(&sample(i)).unwrap();
        }
        let before = table.to_bytes();

        assert!(matches!(table.insert(&sample(9999)), Err(Error::TableFull)));
        assert_eq!(table.len(), TABLE_MAX_ROWS);
        assert_eq!(table.as_bytes(), before.as_slice());
        assert_eq!(table.scan().last().unwrap().id, (TABLE_MAX_ROWS - 1) as u32);
    }

    #[test]
    fn insert_truncates_long_username() {
        let mut table = Table::new();
        let long = format!("{}tail", "a".repeat(32));
        table.insert(&Row::new(1, long, "a@b.c")).unwrap();

        let row = table.scan().next().unwrap();
        assert_eq!(row.username, "a".repeat(32).into_bytes());
    }

    #[test]
    fn from_bytes_round_trips() {
        let mut table = Table::new();
        for i in 0..20 {
            table.insert(&sample(i)).unwrap();
        }

        let restored = Table::from_bytes(table.to_bytes());
        assert_eq!(restored.len(), 20);
        assert_eq!(
            restored.scan().collect::<Vec<_>>(),
            table.scan().collect::<Vec<_>>()
        );
    }

    #[test]
    fn from_bytes_keeps_partial_trailing_row_verbatim() {
        let mut table = Table::new();
        table.insert(&sample(1)).unwrap();
        table.insert(&sample(2)).unwrap();

        let mut bytes = table.to_bytes();
        bytes.extend_from_slice(&[0xAB; 10]);

        let mut restored = Table::from_bytes(bytes.clone());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.scan().count(), 2);
        assert_eq!(restored.to_bytes(), bytes);

        // The next slot starts right after the last whole row.
        restored.insert(&sample(3)).unwrap();
        assert_eq!(restored.as_bytes().len(), bytes.len() + ROW_SIZE);
        assert_eq!(&restored.as_bytes()[..2 * ROW_SIZE], &bytes[..2 * ROW_SIZE]);
        let ids: Vec<u32> = restored.scan().map(|r| r.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn from_bytes_keeps_rows_past_capacity() {
        let mut bytes = vec![0x11; (TABLE_MAX_ROWS + 2) * ROW_SIZE];
        bytes.extend_from_slice(&[0x22; 5]);

        let mut restored = Table::from_bytes(bytes.clone());
        assert_eq!(restored.len(), TABLE_MAX_ROWS + 2);
        assert_eq!(restored.scan().len(), TABLE_MAX_ROWS);
        assert_eq!(restored.scan().count(), TABLE_MAX_ROWS);

        assert!(matches!(restored.insert(&sample(1)), Err(Error::TableFull)));
        assert_eq!(restored.as_bytes(), bytes.as_slice());
    }

    #[test]
    #[should_panic(expected = "row 1 out of bounds")]
    fn scan_panics_when_a_counted_row_has_no_slot() {
        let table = Table {
            pages: vec![0; ROW_SIZE],
            num_rows: 2,
        };
        let _ = table.scan().count();
    }
}
