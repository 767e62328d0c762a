use crate::db::models::member_domain::HEADER;
use crate::db::models::MemberDomain;
use crate::error::AppResult;
use crate::services::sheets::{SheetSpec, SheetStore};

pub const MEMBER_DOMAINS_SHEET: &str = "member_domains";

// ============================================================================
// Member Domain Repository (master spreadsheet)
// ============================================================================

pub struct MemberDomainRepository;

impl MemberDomainRepository {
    pub fn sheet_spec() -> SheetSpec {
        SheetSpec::new(MEMBER_DOMAINS_SHEET, &HEADER)
    }

    pub async fn list(sheets: &dyn SheetStore, master_id: &str) -> AppResult<Vec<MemberDomain>> {
        let rows = sheets.read_rows(master_id, MEMBER_DOMAINS_SHEET).await?;
        Ok(rows
            .iter()
            .skip(1)
            .map(|row| MemberDomain::from_row(row))
            .filter(|d| !d.domain.is_empty())
            .collect())
    }

    /// `domain` must already be normalized.
    pub async fn find(
        sheets: &dyn SheetStore,
        master_id: &str,
        domain: &str,
    ) -> AppResult<Option<(usize, MemberDomain)>> {
        let rows = sheets.read_rows(master_id, MEMBER_DOMAINS_SHEET).await?;
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx + 1, MemberDomain::from_row(row)))
            .find(|(_, d)| d.domain == domain))
    }

    pub async fn insert(
        sheets: &dyn SheetStore,
        master_id: &str,
        domain: &MemberDomain,
    ) -> AppResult<()> {
        sheets
            .append_row(master_id, MEMBER_DOMAINS_SHEET, domain.to_row())
            .await
    }

    /// Blank the row; empty rows are skipped on read.
    pub async fn remove(
        sheets: &dyn SheetStore,
        master_id: &str,
        row_index: usize,
    ) -> AppResult<()> {
        sheets
            .update_row(
                master_id,
                MEMBER_DOMAINS_SHEET,
                row_index,
                vec![String::new(); HEADER.len()],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{header, MemorySheets};

    #[tokio::test]
    async fn removed_domains_disappear_from_listing() {
        let sheets = MemorySheets::default();
        sheets.seed(
            "m",
            MEMBER_DOMAINS_SHEET,
            vec![
                header(&HEADER),
                vec!["example.com".to_string(), "t".to_string()],
                vec!["@Partner.co.jp".to_string(), "t".to_string()],
            ],
        );

        let (idx, found) = MemberDomainRepository::find(&sheets, "m", "partner.co.jp")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(idx, 3);
        assert_eq!(found.domain, "partner.co.jp");

        MemberDomainRepository::remove(&sheets, "m", 2).await.unwrap();
        let domains: Vec<String> = MemberDomainRepository::list(&sheets, "m")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.domain)
            .collect();
        assert_eq!(domains, vec!["partner.co.jp"]);
    }
}
