use crate::db::models::reservation::{col, HEADER};
use crate::db::models::{Reservation, ReservationStatus, SurveyKind};
use crate::db::models::row::bool_cell;
use crate::error::AppResult;
use crate::services::sheets::{SheetSpec, SheetStore};

pub const RESERVATIONS_SHEET: &str = "reservations";

// ============================================================================
// Reservation Repository (per-seminar spreadsheet)
// ============================================================================

pub struct ReservationRepository;

impl ReservationRepository {
    pub fn sheet_spec() -> SheetSpec {
        SheetSpec::new(RESERVATIONS_SHEET, &HEADER)
    }

    /// Reservations with their 1-based sheet rows.
    pub async fn list_with_rows(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
    ) -> AppResult<Vec<(usize, Reservation)>> {
        let rows = sheets.read_rows(spreadsheet_id, RESERVATIONS_SHEET).await?;
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx + 1, Reservation::from_row(row)))
            .filter(|(_, r)| !r.id.is_empty())
            .collect())
    }

    pub async fn list(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
    ) -> AppResult<Vec<Reservation>> {
        Ok(Self::list_with_rows(sheets, spreadsheet_id)
            .await?
            .into_iter()
            .map(|(_, r)| r)
            .collect())
    }

    pub async fn find_by_id(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        id: &str,
    ) -> AppResult<Option<(usize, Reservation)>> {
        if id.trim().is_empty() {
            return Ok(None);
        }
        Ok(sheets
            .find_row_by_id(spreadsheet_id, RESERVATIONS_SHEET, id.trim())
            .await?
            .map(|(idx, row)| (idx, Reservation::from_row(&row))))
    }

    /// Case-insensitive match on the reservation number.
    pub async fn find_by_number(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        number: &str,
    ) -> AppResult<Option<(usize, Reservation)>> {
        let number = number.trim();
        Ok(Self::list_with_rows(sheets, spreadsheet_id)
            .await?
            .into_iter()
            .find(|(_, r)| r.reservation_number.eq_ignore_ascii_case(number)))
    }

    pub async fn find_confirmed_by_email(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        email: &str,
    ) -> AppResult<Option<Reservation>> {
        Ok(Self::list(sheets, spreadsheet_id)
            .await?
            .into_iter()
            .find(|r| r.is_confirmed() && r.email_matches(email)))
    }

    pub async fn insert(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        reservation: &Reservation,
    ) -> AppResult<()> {
        sheets
            .append_row(spreadsheet_id, RESERVATIONS_SHEET, reservation.to_row())
            .await
    }

    pub async fn update(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        row_index: usize,
        reservation: &Reservation,
    ) -> AppResult<()> {
        sheets
            .update_row(spreadsheet_id, RESERVATIONS_SHEET, row_index, reservation.to_row())
            .await
    }

    pub async fn set_status(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        row_index: usize,
        status: ReservationStatus,
    ) -> AppResult<()> {
        sheets
            .update_cell(
                spreadsheet_id,
                RESERVATIONS_SHEET,
                row_index,
                col::STATUS,
                status.as_str().to_string(),
            )
            .await
    }

    pub async fn mark_survey_completed(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        row_index: usize,
        kind: SurveyKind,
    ) -> AppResult<()> {
        let column = match kind {
            SurveyKind::Pre => col::PRE_SURVEY_COMPLETED,
            SurveyKind::Post => col::POST_SURVEY_COMPLETED,
        };
        sheets
            .update_cell(spreadsheet_id, RESERVATIONS_SHEET, row_index, column, bool_cell(true))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::reservation::sample_reservation;
    use crate::services::testing::{header, MemorySheets};

    fn sheets_with(reservations: &[Reservation]) -> MemorySheets {
        let sheets = MemorySheets::default();
        let mut rows = vec![header(&HEADER)];
        rows.extend(reservations.iter().map(Reservation::to_row));
        sheets.seed("s", RESERVATIONS_SHEET, rows);
        sheets
    }

    #[tokio::test]
    async fn number_lookup_ignores_case() {
        let sheets = sheets_with(&[sample_reservation()]);
        let (idx, found) = ReservationRepository::find_by_number(&sheets, "s", "3f2a9c1e-k7qx2m")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(idx, 2);
        assert_eq!(found.id, "r-1");
    }

    #[tokio::test]
    async fn cancelled_bookings_do_not_count_as_duplicates() {
        let cancelled = Reservation {
            status: ReservationStatus::Cancelled,
            ..sample_reservation()
        };
        let sheets = sheets_with(&[cancelled]);
        assert!(ReservationRepository::find_confirmed_by_email(&sheets, "s", "kenji@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn survey_flag_and_status_are_single_cell_writes() {
        let sheets = sheets_with(&[sample_reservation()]);
        ReservationRepository::mark_survey_completed(&sheets, "s", 2, SurveyKind::Post)
            .await
            .unwrap();
        ReservationRepository::set_status(&sheets, "s", 2, ReservationStatus::Cancelled)
            .await
            .unwrap();

        let (_, stored) = ReservationRepository::find_by_id(&sheets, "s", "r-1")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.post_survey_completed);
        assert!(!stored.pre_survey_completed);
        assert_eq!(stored.status, ReservationStatus::Cancelled);
        assert_eq!(stored.email, "kenji@example.com");
    }
}
