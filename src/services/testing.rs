//! In-memory collaborators for service and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{Config, DEFAULT_TENANT};
use crate::db::models::{member_domain, reservation, seminar, survey, Row, Seminar};
use crate::error::{AppError, AppResult};
use crate::services::calendar::{CalendarEventInput, CalendarProvider, CreatedEvent};
use crate::services::email::{EmailMessage, Mailer};
use crate::services::sheets::{SheetSpec, SheetStore};
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "letmein";
pub const MASTER_ID: &str = "master";

// ============================================================================
// Sheets
// ============================================================================

/// Spreadsheet store keyed by `(spreadsheet_id, sheet)`. Writes behave like the
/// values API: a shorter row only overwrites the cells it covers.
#[derive(Default)]
pub struct MemorySheets {
    tabs: Mutex<HashMap<(String, String), Vec<Row>>>,
    created: Mutex<Vec<(String, Option<String>)>>,
    next_id: AtomicUsize,
}

impl MemorySheets {
    pub fn seed(&self, spreadsheet_id: &str, sheet: &str, rows: Vec<Row>) {
        self.tabs
            .lock()
            .unwrap()
            .insert((spreadsheet_id.to_string(), sheet.to_string()), rows);
    }

    pub fn rows(&self, spreadsheet_id: &str, sheet: &str) -> Vec<Row> {
        self.tabs
            .lock()
            .unwrap()
            .get(&(spreadsheet_id.to_string(), sheet.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn remove_tab(&self, spreadsheet_id: &str, sheet: &str) {
        self.tabs
            .lock()
            .unwrap()
            .remove(&(spreadsheet_id.to_string(), sheet.to_string()));
    }

    /// `(title, folder_id)` of every spreadsheet created so far.
    pub fn created(&self) -> Vec<(String, Option<String>)> {
        self.created.lock().unwrap().clone()
    }

    fn with_tab<T>(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        f: impl FnOnce(&mut Vec<Row>) -> T,
    ) -> AppResult<T> {
        let mut tabs = self.tabs.lock().unwrap();
        let tab = tabs
            .get_mut(&(spreadsheet_id.to_string(), sheet.to_string()))
            .ok_or_else(|| AppError::Sheets(format!("Unable to parse range: {}", sheet)))?;
        Ok(f(tab))
    }
}

fn ensure_row(tab: &mut Vec<Row>, row_index: usize) -> &mut Row {
    while tab.len() < row_index {
        tab.push(Vec::new());
    }
    &mut tab[row_index - 1]
}

#[async_trait]
impl SheetStore for MemorySheets {
    async fn read_rows(&self, spreadsheet_id: &str, sheet: &str) -> AppResult<Vec<Row>> {
        self.with_tab(spreadsheet_id, sheet, |tab| tab.clone())
    }

    async fn append_row(&self, spreadsheet_id: &str, sheet: &str, row: Row) -> AppResult<()> {
        self.with_tab(spreadsheet_id, sheet, |tab| tab.push(row))
    }

    async fn update_row(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        row_index: usize,
        row: Row,
    ) -> AppResult<()> {
        self.with_tab(spreadsheet_id, sheet, |tab| {
            let target = ensure_row(tab, row_index);
            for (idx, value) in row.into_iter().enumerate() {
                if idx < target.len() {
                    target[idx] = value;
                } else {
                    target.push(value);
                }
            }
        })
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        row_index: usize,
        column: usize,
        value: String,
    ) -> AppResult<()> {
        self.with_tab(spreadsheet_id, sheet, |tab| {
            let target = ensure_row(tab, row_index);
            while target.len() <= column {
                target.push(String::new());
            }
            target[column] = value;
        })
    }

    async fn create_spreadsheet(
        &self,
        title: &str,
        folder_id: Option<&str>,
        sheets: &[SheetSpec],
    ) -> AppResult<String> {
        let id = format!("mem-sheet-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        for spec in sheets {
            self.seed(&id, &spec.name, vec![spec.header.clone()]);
        }
        self.created
            .lock()
            .unwrap()
            .push((title.to_string(), folder_id.map(str::to_string)));
        Ok(id)
    }
}

// ============================================================================
// Calendar
// ============================================================================

#[derive(Default)]
pub struct FakeCalendar {
    created: Mutex<Vec<CalendarEventInput>>,
    updated: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    fail: AtomicBool,
}

impl FakeCalendar {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<CalendarEventInput> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<String> {
        self.updated.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn check(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Calendar("calendar unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn create_event(&self, input: &CalendarEventInput) -> AppResult<CreatedEvent> {
        self.check()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.created.lock().unwrap().push(input.clone());
        Ok(CreatedEvent {
            event_id: format!("evt-{}", n),
            meeting_url: if input.with_conference {
                format!("https://meet.example.com/evt-{}", n)
            } else {
                String::new()
            },
        })
    }

    async fn update_event(
        &self,
        event_id: &str,
        input: &CalendarEventInput,
    ) -> AppResult<CreatedEvent> {
        self.check()?;
        self.updated.lock().unwrap().push(event_id.to_string());
        Ok(CreatedEvent {
            event_id: event_id.to_string(),
            meeting_url: if input.with_conference {
                format!("https://meet.example.com/{}", event_id)
            } else {
                String::new()
            },
        })
    }

    async fn delete_event(&self, event_id: &str) -> AppResult<()> {
        self.check()?;
        self.deleted.lock().unwrap().push(event_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Mailer
// ============================================================================

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl FakeMailer {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Email("mail provider unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Application state wired to in-memory collaborators, with an empty master
/// spreadsheet for the default tenant.
pub struct Harness {
    pub state: Arc<AppState>,
    pub sheets: Arc<MemorySheets>,
    pub calendar: Arc<FakeCalendar>,
    pub mailer: Arc<FakeMailer>,
}

impl Harness {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.auth.secret = TEST_SECRET.to_string();
        config.server.public_base_url = "https://seminars.example.com".to_string();
        if let Some(tenant) = config.tenants.tenants.get_mut(DEFAULT_TENANT) {
            tenant.admin_password = TEST_PASSWORD.to_string();
        }
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        let sheets = Arc::new(MemorySheets::default());
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(FakeMailer::default());

        for tenant in config.tenants.tenants.values() {
            sheets.seed(
                &tenant.master_spreadsheet_id,
                "seminars",
                vec![header(&seminar::HEADER)],
            );
            sheets.seed(
                &tenant.master_spreadsheet_id,
                "member_domains",
                vec![header(&member_domain::HEADER)],
            );
        }

        let state = Arc::new(AppState {
            config,
            sheets: sheets.clone(),
            calendar: calendar.clone(),
            mailer: mailer.clone(),
        });

        Self {
            state,
            sheets,
            calendar,
            mailer,
        }
    }

    /// Store a seminar in the default master sheet and give it an empty
    /// per-seminar spreadsheet.
    pub fn seed_seminar(&self, seminar: &Seminar) {
        let mut rows = self.sheets.rows(MASTER_ID, "seminars");
        rows.push(seminar.to_row());
        self.sheets.seed(MASTER_ID, "seminars", rows);

        let id = &seminar.spreadsheet_id;
        self.sheets
            .seed(id, "reservations", vec![header(&reservation::HEADER)]);
        self.sheets
            .seed(id, "pre_survey", vec![header(&survey::RESPONSE_HEADER)]);
        self.sheets
            .seed(id, "post_survey", vec![header(&survey::RESPONSE_HEADER)]);
        self.sheets
            .seed(id, "survey_questions", vec![header(&survey::QUESTION_HEADER)]);
    }

    pub fn seed_member_domain(&self, domain: &str) {
        let mut rows = self.sheets.rows(MASTER_ID, "member_domains");
        rows.push(vec![domain.to_string(), "2026-01-01T00:00:00+00:00".to_string()]);
        self.sheets.seed(MASTER_ID, "member_domains", rows);
    }

    /// Current master-sheet copy of a seminar.
    pub fn seminar(&self, id: &str) -> Option<Seminar> {
        self.sheets
            .rows(MASTER_ID, "seminars")
            .iter()
            .skip(1)
            .map(|r| Seminar::from_row(r))
            .find(|s| s.id == id)
    }
}

pub fn header(cells: &[&str]) -> Row {
    cells.iter().map(|c| c.to_string()).collect()
}
