use crate::db::models::reservation::seminar_id_has_prefix;
use crate::db::models::row::cell;
use crate::db::models::seminar::{col, HEADER};
use crate::db::models::Seminar;
use crate::error::AppResult;
use crate::services::sheets::{SheetSpec, SheetStore};

pub const SEMINARS_SHEET: &str = "seminars";

// ============================================================================
// Seminar Repository (master spreadsheet)
// ============================================================================

pub struct SeminarRepository;

impl SeminarRepository {
    pub fn sheet_spec() -> SheetSpec {
        SheetSpec::new(SEMINARS_SHEET, &HEADER)
    }

    /// Every seminar row with an id, in sheet order.
    pub async fn list(sheets: &dyn SheetStore, master_id: &str) -> AppResult<Vec<Seminar>> {
        let rows = sheets.read_rows(master_id, SEMINARS_SHEET).await?;
        Ok(rows
            .iter()
            .skip(1)
            .map(|row| Seminar::from_row(row))
            .filter(|s| !s.id.is_empty())
            .collect())
    }

    /// Seminar and its 1-based sheet row.
    pub async fn find_by_id(
        sheets: &dyn SheetStore,
        master_id: &str,
        id: &str,
    ) -> AppResult<Option<(usize, Seminar)>> {
        if id.trim().is_empty() {
            return Ok(None);
        }
        Ok(sheets
            .find_row_by_id(master_id, SEMINARS_SHEET, id.trim())
            .await?
            .map(|(idx, row)| (idx, Seminar::from_row(&row))))
    }

    /// Seminar owning a reservation-number prefix.
    pub async fn find_by_number_prefix(
        sheets: &dyn SheetStore,
        master_id: &str,
        prefix: &str,
    ) -> AppResult<Option<(usize, Seminar)>> {
        let rows = sheets.read_rows(master_id, SEMINARS_SHEET).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| seminar_id_has_prefix(cell(row, col::ID).trim(), prefix))
            .map(|(idx, row)| (idx + 1, Seminar::from_row(&row))))
    }

    pub async fn insert(
        sheets: &dyn SheetStore,
        master_id: &str,
        seminar: &Seminar,
    ) -> AppResult<()> {
        sheets
            .append_row(master_id, SEMINARS_SHEET, seminar.to_row())
            .await
    }

    /// Overwrite a whole row; legacy rows are rewritten in the current layout.
    pub async fn update(
        sheets: &dyn SheetStore,
        master_id: &str,
        row_index: usize,
        seminar: &Seminar,
    ) -> AppResult<()> {
        sheets
            .update_row(master_id, SEMINARS_SHEET, row_index, seminar.to_row())
            .await
    }

    /// Write only the denormalized booking counter. The column sits before the
    /// layout-dependent tail, so this works for legacy rows too.
    pub async fn set_current_bookings(
        sheets: &dyn SheetStore,
        master_id: &str,
        row_index: usize,
        value: i64,
    ) -> AppResult<()> {
        sheets
            .update_cell(
                master_id,
                SEMINARS_SHEET,
                row_index,
                col::CURRENT_BOOKINGS,
                value.max(0).to_string(),
            )
            .await
    }
}
