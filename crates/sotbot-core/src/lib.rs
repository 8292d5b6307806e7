//! Domain logic for the construction-supervision bot: worksheet layout,
//! remark classification, schedule queries, the inspector visit wizard and
//! the callback/menu grammar. No I/O lives here.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime};

/// Fixed department timezone (Moscow, UTC+3).
pub const DEPARTMENT_UTC_OFFSET_HOURS: i64 = 3;

/// Soft cap on outgoing message bodies; Telegram rejects texts over 4096
/// characters, card lists stop appending well before that.
pub const MESSAGE_SOFT_LIMIT: usize = 3500;

/// Today's date in the department timezone.
#[must_use]
pub fn department_today() -> Date {
    (OffsetDateTime::now_utc() + Duration::hours(DEPARTMENT_UTC_OFFSET_HOURS)).date()
}

// ---------------------------------------------------------------------------
// Worksheet addressing
// ---------------------------------------------------------------------------

/// Convert a spreadsheet column reference (`A`, `Q`, `AD`) to a 0-based index.
///
/// Returns `None` for empty input or any non-letter character.
#[must_use]
pub fn col_index(letters: &str) -> Option<usize> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut index = 0_usize;
    for ch in trimmed.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        index = index * 26 + (upper as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

/// Build an A1 cell reference such as `График!Q25` (rows are 1-based).
#[must_use]
pub fn cell_ref(sheet: &str, column: &str, row: u32) -> String {
    format!("{sheet}!{column}{row}")
}

fn cell(cells: &[String], column: &str) -> String {
    col_index(column)
        .and_then(|index| cells.get(index))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

fn date_from_parts(day: &str, month: &str, year: &str) -> Option<Date> {
    let day: u8 = day.trim().parse().ok()?;
    let month: u8 = month.trim().parse().ok()?;
    let mut year: i32 = year.trim().parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Strict `DD.MM.YYYY` parsing for wizard input.
#[must_use]
pub fn parse_date_dmy(value: &str) -> Option<Date> {
    let parts: Vec<&str> = value.trim().split('.').collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    date_from_parts(parts[0], parts[1], parts[2])
}

/// Lenient date parsing for worksheet cells: `DD.MM.YYYY`, `DD.MM.YY`
/// or `YYYY-MM-DD`. Empty and unparseable cells yield `None`.
#[must_use]
pub fn parse_flex_date(value: &str) -> Option<Date> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let dotted: Vec<&str> = trimmed.split('.').collect();
    if dotted.len() == 3 {
        return date_from_parts(dotted[0], dotted[1], dotted[2]);
    }

    let dashed: Vec<&str> = trimmed.split('-').collect();
    if dashed.len() == 3 {
        return date_from_parts(dashed[2], dashed[1], dashed[0]);
    }

    None
}

/// Render a date the way the worksheets store it: `DD.MM.YYYY`.
#[must_use]
pub fn format_date(date: Date) -> String {
    format!("{:02}.{:02}.{}", date.day(), u8::from(date.month()), date.year())
}

fn format_timestamp(at: OffsetDateTime) -> String {
    format!(
        "{:02}.{:02}.{} {:02}:{:02}",
        at.day(),
        u8::from(at.month()),
        at.year(),
        at.hour(),
        at.minute()
    )
}

// ---------------------------------------------------------------------------
// Resolution marks
// ---------------------------------------------------------------------------

/// A resolution mark the bot writes into the worksheet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Yes,
    No,
}

impl Mark {
    /// The literal cell value; the worksheet contract is Russian.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "да",
            Self::No => "нет",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            _ => None,
        }
    }

    /// Callback-data token (`yes`/`no`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

/// What a resolution-mark cell actually contains. Sheets exported through
/// pandas leave literal `nan` strings behind, those count as empty.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MarkCell {
    Yes,
    No,
    Empty,
    Other,
}

impl MarkCell {
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "да" => Self::Yes,
            "нет" => Self::No,
            "" | "nan" => Self::Empty,
            _ => Self::Other,
        }
    }
}

/// The four per-discipline status fields tracked on the remarks worksheet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    FireSafety,
    FireRegistry,
    Architecture,
    Electrical,
}

impl StatusField {
    pub const ALL: [Self; 4] =
        [Self::FireSafety, Self::FireRegistry, Self::Architecture, Self::Electrical];

    /// Callback-data token, kept from the original deployment so pinned
    /// keyboards in old chats keep working.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::FireSafety => "pb",
            Self::FireRegistry => "pbzk",
            Self::Architecture => "ar",
            Self::Electrical => "eom",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pb" => Some(Self::FireSafety),
            "pbzk" => Some(Self::FireRegistry),
            "ar" => Some(Self::Architecture),
            "eom" => Some(Self::Electrical),
            _ => None,
        }
    }

    /// Worksheet column holding this field's resolution mark.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::FireSafety => "Q",
            Self::FireRegistry => "R",
            Self::Architecture => "Y",
            Self::Electrical => "AD",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FireSafety => "ПБ",
            Self::FireRegistry => "ПБ в ЗК КНД",
            Self::Architecture => "АР/ММГН/АГО",
            Self::Electrical => "ЭОМ",
        }
    }
}

impl Display for StatusField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Remarks worksheet
// ---------------------------------------------------------------------------

/// Column letters of the remarks worksheet. The layout is fixed by the
/// department's document template and is not configurable.
pub mod remarks_layout {
    pub const DATE: &str = "B";
    pub const DISTRICT: &str = "D";
    pub const DEVELOPER: &str = "E";
    pub const OBJECT: &str = "F";
    pub const ADDRESS: &str = "G";
    pub const CASE_NO: &str = "H";
    pub const CHECK_TYPE: &str = "I";
    pub const INSPECTOR: &str = "J";

    pub const FIRE_COUNT: &str = "O";
    pub const FIRE_RECHECK: &str = "P";
    pub const FIRE_MARK: &str = "Q";
    pub const FIRE_REGISTRY_MARK: &str = "R";
    pub const FIRE_FILE: &str = "S";
    pub const FIRE_ACT: &str = "T";
    pub const FIRE_NOTE: &str = "U";

    pub const ARCH_COUNT: &str = "V";
    pub const MMGN_COUNT: &str = "W";
    pub const AGO_COUNT: &str = "X";
    pub const ARCH_MARK: &str = "Y";
    pub const ARCH_FILE: &str = "Z";
    pub const ARCH_ACT: &str = "AA";
    pub const ARCH_NOTE: &str = "AB";

    pub const ELEC_COUNT: &str = "AC";
    pub const ELEC_MARK: &str = "AD";
    pub const ELEC_FILE: &str = "AE";
    pub const ELEC_ACT: &str = "AF";
    pub const ELEC_NOTE: &str = "AG";

    pub const COMMON_NOTE: &str = "AH";
    pub const READINESS: &str = "AI";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct FireBlock {
    pub violations: String,
    pub recheck: String,
    pub mark: String,
    pub registry_mark: String,
    pub file_url: String,
    pub act_url: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ArchitectureBlock {
    pub ar_violations: String,
    pub mmgn_violations: String,
    pub ago_violations: String,
    pub mark: String,
    pub file_url: String,
    pub act_url: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ElectricalBlock {
    pub violations: String,
    pub mark: String,
    pub file_url: String,
    pub act_url: String,
    pub note: String,
}

/// One parsed row of the remarks worksheet.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RemarkRow {
    /// 1-based worksheet row number.
    pub row: u32,
    pub date: Option<Date>,
    pub district: String,
    pub developer: String,
    pub object: String,
    pub address: String,
    pub case_no: String,
    pub check_type: String,
    pub inspector: String,
    pub fire: FireBlock,
    pub architecture: ArchitectureBlock,
    pub electrical: ElectricalBlock,
    pub common_note: String,
    pub readiness: String,
}

impl RemarkRow {
    /// Parse one worksheet row. Short rows are tolerated: missing trailing
    /// cells read as empty strings.
    #[must_use]
    pub fn from_cells(row: u32, cells: &[String]) -> Self {
        use remarks_layout as l;

        Self {
            row,
            date: parse_flex_date(&cell(cells, l::DATE)),
            district: cell(cells, l::DISTRICT),
            developer: cell(cells, l::DEVELOPER),
            object: cell(cells, l::OBJECT),
            address: cell(cells, l::ADDRESS),
            case_no: cell(cells, l::CASE_NO),
            check_type: cell(cells, l::CHECK_TYPE),
            inspector: cell(cells, l::INSPECTOR),
            fire: FireBlock {
                violations: cell(cells, l::FIRE_COUNT),
                recheck: cell(cells, l::FIRE_RECHECK),
                mark: cell(cells, l::FIRE_MARK),
                registry_mark: cell(cells, l::FIRE_REGISTRY_MARK),
                file_url: cell(cells, l::FIRE_FILE),
                act_url: cell(cells, l::FIRE_ACT),
                note: cell(cells, l::FIRE_NOTE),
            },
            architecture: ArchitectureBlock {
                ar_violations: cell(cells, l::ARCH_COUNT),
                mmgn_violations: cell(cells, l::MMGN_COUNT),
                ago_violations: cell(cells, l::AGO_COUNT),
                mark: cell(cells, l::ARCH_MARK),
                file_url: cell(cells, l::ARCH_FILE),
                act_url: cell(cells, l::ARCH_ACT),
                note: cell(cells, l::ARCH_NOTE),
            },
            electrical: ElectricalBlock {
                violations: cell(cells, l::ELEC_COUNT),
                mark: cell(cells, l::ELEC_MARK),
                file_url: cell(cells, l::ELEC_FILE),
                act_url: cell(cells, l::ELEC_ACT),
                note: cell(cells, l::ELEC_NOTE),
            },
            common_note: cell(cells, l::COMMON_NOTE),
            readiness: cell(cells, l::READINESS),
        }
    }

    /// The four resolution-mark cells in Q/R/Y/AD order.
    #[must_use]
    pub fn resolution_marks(&self) -> [MarkCell; 4] {
        [
            MarkCell::classify(&self.fire.mark),
            MarkCell::classify(&self.fire.registry_mark),
            MarkCell::classify(&self.architecture.mark),
            MarkCell::classify(&self.electrical.mark),
        ]
    }

    #[must_use]
    pub fn category(&self) -> Option<RemarkCategory> {
        RemarkCategory::classify(self.resolution_marks())
    }
}

/// Parse a whole remarks worksheet dump (header row included) into rows.
/// Data starts at worksheet row 2.
#[must_use]
pub fn parse_remark_rows(rows: &[Vec<String>]) -> Vec<RemarkRow> {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(index, cells)| RemarkRow::from_cells(to_row_number(index), cells))
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn to_row_number(zero_based_index: usize) -> u32 {
    (zero_based_index + 1).min(u32::MAX as usize) as u32
}

/// Document-level resolution state of a remark row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RemarkCategory {
    Resolved,
    Unresolved,
    NotRequired,
}

impl RemarkCategory {
    /// Classify a row by its four resolution marks. A single `нет` makes the
    /// row unresolved regardless of other marks; rows whose marks are all
    /// empty need no resolution at all. Rows with only unrecognized junk in
    /// the mark cells get no category and are skipped everywhere.
    #[must_use]
    pub fn classify(marks: [MarkCell; 4]) -> Option<Self> {
        let has_no = marks.contains(&MarkCell::No);
        let has_yes = marks.contains(&MarkCell::Yes);
        let all_empty = marks.iter().all(|mark| *mark == MarkCell::Empty);

        if has_no {
            Some(Self::Unresolved)
        } else if has_yes {
            Some(Self::Resolved)
        } else if all_empty {
            Some(Self::NotRequired)
        } else {
            None
        }
    }

    /// Callback-data token, kept from the original deployment.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Resolved => "done",
            Self::Unresolved => "not_done",
            Self::NotRequired => "not_required",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "done" => Some(Self::Resolved),
            "not_done" => Some(Self::Unresolved),
            "not_required" => Some(Self::NotRequired),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Resolved => "Устранены",
            Self::Unresolved => "Не устранены",
            Self::NotRequired => "Не требуется",
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule worksheet
// ---------------------------------------------------------------------------

/// Header the visit wizard writes when the schedule worksheet is empty.
pub const SCHEDULE_HEADER: [&str; 10] = [
    "№ п/п",
    "Дата выезда",
    "Площадь. Этажность",
    "ОНзС",
    "Наименование застройщика",
    "Наименование объекта",
    "Строительный адрес",
    "Номер дела",
    "Вид проверки",
    "Должностное лицо УПКиСОТ",
];

/// One parsed row of the schedule worksheet (columns A–J).
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ScheduleEntry {
    /// 1-based worksheet row number.
    pub row: u32,
    pub date: Option<Date>,
    pub area_floors: String,
    pub district: String,
    pub developer: String,
    pub object: String,
    pub address: String,
    pub case_no: String,
    pub check_type: String,
    pub inspector: String,
}

impl ScheduleEntry {
    #[must_use]
    pub fn from_cells(row: u32, cells: &[String]) -> Self {
        let at = |index: usize| -> String {
            cells.get(index).map(|value| value.trim().to_string()).unwrap_or_default()
        };

        Self {
            row,
            date: parse_flex_date(&at(1)),
            area_floors: at(2),
            district: at(3),
            developer: at(4),
            object: at(5),
            address: at(6),
            case_no: at(7),
            check_type: at(8),
            inspector: at(9),
        }
    }

    /// Final inspections are matched by substring, the worksheet holds
    /// variants like «итоговая» and «итоговая проверка».
    #[must_use]
    pub fn is_final_inspection(&self) -> bool {
        self.check_type.to_lowercase().contains("итог")
    }
}

/// Parse a schedule worksheet dump (header row included).
#[must_use]
pub fn parse_schedule(rows: &[Vec<String>]) -> Vec<ScheduleEntry> {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(index, cells)| ScheduleEntry::from_cells(to_row_number(index), cells))
        .collect()
}

/// Dated entries on or after `today`, soonest first. Undated rows never make
/// the list.
#[must_use]
pub fn upcoming_visits<'a>(entries: &'a [ScheduleEntry], today: Date) -> Vec<&'a ScheduleEntry> {
    let mut upcoming: Vec<&ScheduleEntry> =
        entries.iter().filter(|entry| entry.date.is_some_and(|date| date >= today)).collect();
    upcoming.sort_by_key(|entry| entry.date);
    upcoming
}

/// Upcoming entries narrowed to final inspections.
#[must_use]
pub fn upcoming_final_visits<'a>(
    entries: &'a [ScheduleEntry],
    today: Date,
) -> Vec<&'a ScheduleEntry> {
    upcoming_visits(entries, today)
        .into_iter()
        .filter(|entry| entry.is_final_inspection())
        .collect()
}

// ---------------------------------------------------------------------------
// Reporting periods
// ---------------------------------------------------------------------------

/// Period preset offered on the district keyboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PeriodChoice {
    Days30,
    Days90,
    All,
    Custom,
}

impl PeriodChoice {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Days30 => "30",
            Self::Days90 => "90",
            Self::All => "all",
            Self::Custom => "custom",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "30" => Some(Self::Days30),
            "90" => Some(Self::Days90),
            "all" => Some(Self::All),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A date filter over worksheet rows. An unbounded period admits undated
/// rows; any bound excludes them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Period {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl Period {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_days(today: Date, days: i64) -> Self {
        Self { from: Some(today - Duration::days(days)), to: None }
    }

    #[must_use]
    pub fn range(from: Date, to: Date) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    #[must_use]
    pub fn contains(&self, date: Option<Date>) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        if self.from.is_some_and(|from| date < from) {
            return false;
        }
        !self.to.is_some_and(|to| date > to)
    }
}

/// Parse a user-entered `DD.MM.YYYY-DD.MM.YYYY` range. Dashes users tend to
/// produce (en/em dash) are accepted; a reversed range is swapped.
#[must_use]
pub fn parse_period_range(text: &str) -> Option<(Date, Date)> {
    let normalized = text.trim().replace(['—', '–'], "-");
    let (left, right) = normalized.split_once('-')?;
    let mut from = parse_date_dmy(left)?;
    let mut to = parse_date_dmy(right)?;
    if to < from {
        std::mem::swap(&mut from, &mut to);
    }
    Some((from, to))
}

// ---------------------------------------------------------------------------
// Inspector visit wizard
// ---------------------------------------------------------------------------

/// A completed visit form, ready to append to the schedule worksheet.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct VisitForm {
    pub date: Date,
    pub area: String,
    pub floors: String,
    pub district: String,
    pub developer: String,
    pub object: String,
    pub address: String,
    pub case_no: String,
    pub check_type: String,
}

impl VisitForm {
    /// Serialize to schedule columns A–J. Area and floor count share one
    /// cell, that is how the worksheet template is laid out.
    #[must_use]
    pub fn to_row(&self, serial: u32, inspector: &str) -> Vec<String> {
        vec![
            serial.to_string(),
            format_date(self.date),
            format!("Площадь: {}; этажность: {}", self.area, self.floors),
            self.district.clone(),
            self.developer.clone(),
            self.object.clone(),
            self.address.clone(),
            self.case_no.clone(),
            self.check_type.clone(),
            inspector.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum WizardStep {
    VisitDate,
    Area,
    Floors,
    District,
    Developer,
    Object,
    Address,
    CaseNo,
    CheckType,
}

/// What the wizard wants after consuming one message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WizardOutcome {
    /// Ask the next question.
    Prompt(&'static str),
    /// The input was rejected, ask the same question again.
    Retry(&'static str),
    /// All nine answers collected.
    Complete(Box<VisitForm>),
}

/// Sequential nine-question form for logging an inspector visit.
#[derive(Debug, Clone)]
pub struct VisitWizard {
    step: WizardStep,
    date: Option<Date>,
    area: String,
    floors: String,
    district: String,
    developer: String,
    object: String,
    address: String,
    case_no: String,
}

impl Default for VisitWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitWizard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: WizardStep::VisitDate,
            date: None,
            area: String::new(),
            floors: String::new(),
            district: String::new(),
            developer: String::new(),
            object: String::new(),
            address: String::new(),
            case_no: String::new(),
        }
    }

    /// Greeting plus the first question.
    #[must_use]
    pub fn intro() -> &'static str {
        "Раздел «👷 Инспектор».\nСейчас по шагам заполним данные выезда.\n\nШаг 1/8.\nВведите дату выезда в формате ДД.ММ.ГГГГ:"
    }

    /// Consume one user message and advance.
    pub fn feed(&mut self, input: &str) -> WizardOutcome {
        let text = input.trim().to_string();

        match self.step {
            WizardStep::VisitDate => match parse_date_dmy(&text) {
                Some(date) => {
                    self.date = Some(date);
                    self.step = WizardStep::Area;
                    WizardOutcome::Prompt("Шаг 2/8.\nПлощадь (кв.м):")
                }
                None => WizardOutcome::Retry(
                    "Не понял дату. Введите в формате ДД.ММ.ГГГГ, например 03.12.2025.",
                ),
            },
            WizardStep::Area => {
                self.area = text;
                self.step = WizardStep::Floors;
                WizardOutcome::Prompt("Шаг 3/8.\nКоличество этажей:")
            }
            WizardStep::Floors => {
                self.floors = text;
                self.step = WizardStep::District;
                WizardOutcome::Prompt("Шаг 4/8.\nОНзС (1–12):")
            }
            WizardStep::District => {
                self.district = text;
                self.step = WizardStep::Developer;
                WizardOutcome::Prompt("Шаг 5/8.\nНаименование застройщика:")
            }
            WizardStep::Developer => {
                self.developer = text;
                self.step = WizardStep::Object;
                WizardOutcome::Prompt("Шаг 6/8.\nНаименование объекта:")
            }
            WizardStep::Object => {
                self.object = text;
                self.step = WizardStep::Address;
                WizardOutcome::Prompt("Шаг 7/8.\nСтроительный адрес:")
            }
            WizardStep::Address => {
                self.address = text;
                self.step = WizardStep::CaseNo;
                WizardOutcome::Prompt("Шаг 8/8.\nНомер дела (формат 00-00-000000):")
            }
            WizardStep::CaseNo => {
                self.case_no = text;
                self.step = WizardStep::CheckType;
                WizardOutcome::Prompt(
                    "Дополнительно укажите вид проверки\n(ПП, итоговая, профвизит, запрос ОНзС, поручение руководства):",
                )
            }
            WizardStep::CheckType => {
                let date = self.date.unwrap_or_else(department_today);
                WizardOutcome::Complete(Box::new(VisitForm {
                    date,
                    area: self.area.clone(),
                    floors: self.floors.clone(),
                    district: self.district.clone(),
                    developer: self.developer.clone(),
                    object: self.object.clone(),
                    address: self.address.clone(),
                    case_no: self.case_no.clone(),
                    check_type: text,
                }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Menu and callback grammar
// ---------------------------------------------------------------------------

pub const MENU_SCHEDULE: &str = "📅 График";
pub const MENU_FINAL: &str = "📊 Итоговая";
pub const MENU_REMARKS: &str = "📝 Замечания";
pub const MENU_DISTRICTS: &str = "🏗 ОНзС";
pub const MENU_INSPECTOR: &str = "👷 Инспектор";
pub const MENU_ANALYTICS: &str = "📈 Аналитика";

/// Main-menu reply keyboard rows.
#[must_use]
pub fn main_menu_rows() -> [[&'static str; 2]; 3] {
    [
        [MENU_SCHEDULE, MENU_FINAL],
        [MENU_REMARKS, MENU_DISTRICTS],
        [MENU_INSPECTOR, MENU_ANALYTICS],
    ]
}

/// A main-menu button pressed by the user.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MenuAction {
    Schedule,
    FinalInspections,
    Remarks,
    Districts,
    Inspector,
    Analytics,
}

impl MenuAction {
    /// Match message text against the menu labels, case-insensitively.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();
        let matches = |label: &str| normalized == label.to_lowercase();

        if matches(MENU_SCHEDULE) {
            Some(Self::Schedule)
        } else if matches(MENU_FINAL) {
            Some(Self::FinalInspections)
        } else if matches(MENU_REMARKS) {
            Some(Self::Remarks)
        } else if matches(MENU_DISTRICTS) {
            Some(Self::Districts)
        } else if matches(MENU_INSPECTOR) {
            Some(Self::Inspector)
        } else if matches(MENU_ANALYTICS) {
            Some(Self::Analytics)
        } else {
            None
        }
    }
}

/// Every inline-keyboard action the bot understands. The wire encoding is
/// pinned: keyboards sent by the previous deployment must keep working.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CallbackAction {
    RemarksFilter(RemarkCategory),
    DistrictSelect(u8),
    DistrictPeriod { district: u8, choice: PeriodChoice },
    SetStatus { field: StatusField, mark: Mark, row: u32 },
    Attach { district: u8, row: u32 },
}

impl CallbackAction {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::RemarksFilter(category) => format!("remarks_{}", category.code()),
            Self::DistrictSelect(district) => format!("onzs_select_{district}"),
            Self::DistrictPeriod { district, choice } => {
                format!("onzs_period_{district}_{}", choice.code())
            }
            Self::SetStatus { field, mark, row } => {
                format!("status_{}_{}_{row}", field.code(), mark.code())
            }
            Self::Attach { district, row } => format!("attach_onzs_{district}_{row}"),
        }
    }

    /// Parse callback data. Malformed data yields `None` and is ignored by
    /// the dispatcher, never treated as an error.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix("remarks_") {
            return RemarkCategory::parse(rest).map(Self::RemarksFilter);
        }
        if let Some(rest) = data.strip_prefix("onzs_select_") {
            return rest.parse().ok().map(Self::DistrictSelect);
        }
        if let Some(rest) = data.strip_prefix("onzs_period_") {
            let (district, choice) = rest.split_once('_')?;
            return Some(Self::DistrictPeriod {
                district: district.parse().ok()?,
                choice: PeriodChoice::parse(choice)?,
            });
        }
        if let Some(rest) = data.strip_prefix("status_") {
            let mut parts = rest.splitn(3, '_');
            let field = StatusField::parse(parts.next()?)?;
            let mark = Mark::parse(parts.next()?)?;
            let row = parts.next()?.parse().ok()?;
            return Some(Self::SetStatus { field, mark, row });
        }
        if let Some(rest) = data.strip_prefix("attach_onzs_") {
            let (district, row) = rest.split_once('_')?;
            return Some(Self::Attach {
                district: district.parse().ok()?,
                row: row.parse().ok()?,
            });
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct StatusTally {
    pub yes: u32,
    pub no: u32,
}

/// One row of the status-change history, newest entries first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub sheet_row: u32,
    pub fire: Option<Mark>,
    pub fire_registry: Option<Mark>,
    pub architecture: Option<Mark>,
    pub electrical: Option<Mark>,
    pub updated_by_id: i64,
    pub updated_by_username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Aggregates the analytics section renders, produced by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    pub fire: StatusTally,
    pub fire_registry: StatusTally,
    pub architecture: StatusTally,
    pub electrical: StatusTally,
    pub attachments_total: u64,
    #[serde(default)]
    pub recent: Vec<StatusChange>,
}

// ---------------------------------------------------------------------------
// Message rendering
// ---------------------------------------------------------------------------

/// Plain-text bodies for every section. Telegram markup stays out of the
/// core; keyboards are the transport crate's concern.
pub mod render {
    use super::{
        format_date, format_timestamp, AnalyticsSummary, Mark, RemarkCategory, RemarkRow,
        ScheduleEntry, MESSAGE_SOFT_LIMIT,
    };

    fn or_dash(value: &str) -> &str {
        if value.is_empty() {
            "-"
        } else {
            value
        }
    }

    /// The schedule section body: the ten soonest visits.
    #[must_use]
    pub fn schedule_report(upcoming: &[&ScheduleEntry]) -> String {
        let mut lines = vec!["📅 График выездов (по данным Google Sheets):".to_string(), String::new()];

        for entry in upcoming.iter().take(10) {
            let date = entry.date.map_or_else(|| "-".to_string(), format_date);
            let mut line = format!("• {date} — {}", or_dash(&entry.check_type));
            if !entry.case_no.is_empty() {
                line.push_str(&format!(" — дело: {}", entry.case_no));
            }
            if !entry.district.is_empty() {
                line.push_str(&format!(" — ОНзС: {}", entry.district));
            }
            lines.push(line);
        }

        if upcoming.is_empty() {
            lines.push("Ближайших выездов в графике не найдено.".to_string());
        }

        lines.join("\n")
    }

    /// The final-inspections section body: up to twenty upcoming finals.
    #[must_use]
    pub fn final_report(finals: &[&ScheduleEntry]) -> String {
        let mut lines = vec!["📊 Ближайшие ИТОГОВЫЕ проверки:".to_string(), String::new()];

        if finals.is_empty() {
            lines.push("Нет предстоящих итоговых проверок.".to_string());
        } else {
            for entry in finals.iter().take(20) {
                let date = entry.date.map_or_else(|| "-".to_string(), format_date);
                let mut line = format!("• {date} — {}", or_dash(&entry.check_type));
                if !entry.case_no.is_empty() {
                    line.push_str(&format!(" — дело: {}", entry.case_no));
                }
                if !entry.district.is_empty() {
                    line.push_str(&format!(" — ОНзС: {}", entry.district));
                }
                lines.push(line);
            }
        }

        lines.join("\n")
    }

    #[must_use]
    pub fn remark_filter_caption(category: RemarkCategory) -> &'static str {
        match category {
            RemarkCategory::Resolved => {
                "Список объектов, где замечания УСТРАНЕНЫ (есть «да» и нет «нет» в Q/R/Y/AD):"
            }
            RemarkCategory::Unresolved => {
                "Список объектов, где замечания НЕ УСТРАНЕНЫ (есть хотя бы одно «нет» в Q/R/Y/AD):"
            }
            RemarkCategory::NotRequired => {
                "Список объектов, где отметки об устранении НЕ ТРЕБУЮТСЯ (все Q/R/Y/AD пустые):"
            }
        }
    }

    fn remark_summary_card(row: &RemarkRow, category: RemarkCategory) -> String {
        let mut lines =
            vec![format!("• Строка {} — статус по документу: {}", row.row, category.label())];

        if let Some(date) = row.date {
            lines.push(format!("  Дата выезда: {}", format_date(date)));
        }
        if !row.district.is_empty() {
            lines.push(format!("  ОНзС: {}", row.district));
        }
        if !row.object.is_empty() {
            lines.push(format!("  Объект: {}", row.object));
        }
        if !row.address.is_empty() {
            lines.push(format!("  Адрес: {}", row.address));
        }

        lines.push(format!(
            "  Статусы (Q/R/Y/AD): ПБ={}; ПБ в ЗК КНД={}; АР/ММГН/АГО={}; ЭОМ={}",
            or_dash(&row.fire.mark),
            or_dash(&row.fire.registry_mark),
            or_dash(&row.architecture.mark),
            or_dash(&row.electrical.mark),
        ));
        lines.push(format!("  Кол-во нарушений ПБ: {}", or_dash(&row.fire.violations)));
        lines.push(format!("  Кол-во нарушений ЭОМ: {}", or_dash(&row.electrical.violations)));

        lines.join("\n")
    }

    /// The remarks section body: every row of the chosen category as a short
    /// card, truncated near the Telegram message limit.
    #[must_use]
    pub fn remark_summary(category: RemarkCategory, rows: &[RemarkRow]) -> String {
        let mut body = format!("{}\n", remark_filter_caption(category));
        let mut matched = false;

        for row in rows {
            if row.category() != Some(category) {
                continue;
            }
            let card = remark_summary_card(row, category);
            if body.len() + card.len() + 2 > MESSAGE_SOFT_LIMIT {
                break;
            }
            body.push('\n');
            body.push_str(&card);
            body.push('\n');
            matched = true;
        }

        if !matched {
            body.push_str("\nПо текущему файлу таких строк нет.");
        }

        body
    }

    /// The full per-row card shown in the district section, one message per
    /// row, all three discipline blocks.
    #[must_use]
    pub fn remark_card(row: &RemarkRow) -> String {
        let mut lines = vec![
            format!("ОНзС: {}", row.district),
            format!("Строка в таблице: {}", row.row),
            format!("Дата выезда: {}", row.date.map_or_else(|| "-".to_string(), format_date)),
        ];

        if !row.check_type.is_empty() {
            lines.push(format!("Вид проверки: {}", row.check_type));
        }
        if !row.case_no.is_empty() {
            lines.push(format!("Номер дела: {}", row.case_no));
        }
        if !row.developer.is_empty() {
            lines.push(format!("Застройщик: {}", row.developer));
        }
        if !row.object.is_empty() {
            lines.push(format!("Объект: {}", row.object));
        }
        if !row.address.is_empty() {
            lines.push(format!("Адрес: {}", row.address));
        }
        if !row.inspector.is_empty() {
            lines.push(format!("Должностное лицо: {}", row.inspector));
        }

        lines.push(String::new());
        lines.push("Пожарная безопасность:".to_string());
        lines.push(format!("• Кол-во нарушений ПБ: {}", or_dash(&row.fire.violations)));
        lines.push(format!("• РР (нужен/не нужен): {}", or_dash(&row.fire.recheck)));
        lines.push(format!("• Устранение ПБ (Q): {}", or_dash(&row.fire.mark)));
        lines.push(format!("• Устранение ПБ в ЗК КНД (R): {}", or_dash(&row.fire.registry_mark)));
        lines.push(format!("• Файл замечаний ПБ (S): {}", or_dash(&row.fire.file_url)));
        lines.push(format!("• Акт ПБ (T): {}", or_dash(&row.fire.act_url)));
        lines.push(format!("• Примечание ПБ (U): {}", or_dash(&row.fire.note)));

        lines.push(String::new());
        lines.push("АР / ММГН / АГО:".to_string());
        lines.push(format!("• Нарушений АР (V): {}", or_dash(&row.architecture.ar_violations)));
        lines.push(format!("• Нарушений ММГН (W): {}", or_dash(&row.architecture.mmgn_violations)));
        lines.push(format!("• Нарушений АГО (X): {}", or_dash(&row.architecture.ago_violations)));
        lines.push(format!("• Устранение АР/ММГН/АГО (Y): {}", or_dash(&row.architecture.mark)));
        lines.push(format!(
            "• Файл замечаний АР/ММГН/АГО (Z): {}",
            or_dash(&row.architecture.file_url)
        ));
        lines.push(format!("• Акт АР/ММГН/АГО (AA): {}", or_dash(&row.architecture.act_url)));
        lines.push(format!("• Примечание АР/ММГН/АГО (AB): {}", or_dash(&row.architecture.note)));

        lines.push(String::new());
        lines.push("Электроснабжение (ЭОМ):".to_string());
        lines.push(format!("• Нарушений ЭОМ (AC): {}", or_dash(&row.electrical.violations)));
        lines.push(format!("• Устранение ЭОМ (AD): {}", or_dash(&row.electrical.mark)));
        lines.push(format!("• Файл замечаний ЭОМ (AE): {}", or_dash(&row.electrical.file_url)));
        lines.push(format!("• Акт ЭОМ (AF): {}", or_dash(&row.electrical.act_url)));
        lines.push(format!("• Примечание ЭОМ (AG): {}", or_dash(&row.electrical.note)));

        if !row.common_note.is_empty() {
            lines.push(String::new());
            lines.push(format!("Общие примечания (AH): {}", row.common_note));
        }
        if !row.readiness.is_empty() {
            lines.push(format!("ЗОС (AI): {}", row.readiness));
        }

        lines.join("\n")
    }

    fn mark_or_dash(mark: Option<Mark>) -> &'static str {
        mark.map_or("-", Mark::as_str)
    }

    /// The password-gated analytics report.
    #[must_use]
    pub fn analytics_report(summary: &AnalyticsSummary) -> String {
        let mut lines = vec![
            "📈 Аналитика по данным бота".to_string(),
            String::new(),
            "1️⃣ Статусы устранения (по истории изменений):".to_string(),
            format!("• ПБ: да = {}, нет = {}", summary.fire.yes, summary.fire.no),
            format!(
                "• ПБ в ЗК КНД: да = {}, нет = {}",
                summary.fire_registry.yes, summary.fire_registry.no
            ),
            format!(
                "• АР/ММГН/АГО: да = {}, нет = {}",
                summary.architecture.yes, summary.architecture.no
            ),
            format!("• ЭОМ: да = {}, нет = {}", summary.electrical.yes, summary.electrical.no),
            String::new(),
            "2️⃣ Вложения:".to_string(),
            format!("• Всего прикреплённых файлов: {}", summary.attachments_total),
            String::new(),
            "3️⃣ Последние 10 изменений статусов:".to_string(),
        ];

        if summary.recent.is_empty() {
            lines.push("• пока нет данных по изменениям".to_string());
        } else {
            for change in &summary.recent {
                let author = if change.updated_by_username.is_empty() {
                    change.updated_by_id.to_string()
                } else {
                    change.updated_by_username.clone()
                };
                lines.push(format!(
                    "• Строка {} — ПБ={}, ПБЗК={}, АР={}, ЭОМ={}; изменил {} в {}",
                    change.sheet_row,
                    mark_or_dash(change.fire),
                    mark_or_dash(change.fire_registry),
                    mark_or_dash(change.architecture),
                    mark_or_dash(change.electrical),
                    author,
                    format_timestamp(change.updated_at),
                ));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u8, day: u8) -> Date {
        let month = match Month::try_from(month) {
            Ok(month) => month,
            Err(err) => panic!("bad month in test fixture: {err}"),
        };
        match Date::from_calendar_date(year, month, day) {
            Ok(date) => date,
            Err(err) => panic!("bad date in test fixture: {err}"),
        }
    }

    fn cells(values: &[(&str, &str)]) -> Vec<String> {
        let mut row = Vec::new();
        for (column, value) in values {
            let index = match col_index(column) {
                Some(index) => index,
                None => panic!("bad column in test fixture: {column}"),
            };
            if row.len() <= index {
                row.resize(index + 1, String::new());
            }
            row[index] = (*value).to_string();
        }
        row
    }

    #[test]
    fn column_letters_map_to_indices() {
        assert_eq!(col_index("A"), Some(0));
        assert_eq!(col_index("q"), Some(16));
        assert_eq!(col_index("Z"), Some(25));
        assert_eq!(col_index("AA"), Some(26));
        assert_eq!(col_index("AD"), Some(29));
        assert_eq!(col_index(""), None);
        assert_eq!(col_index("A1"), None);
    }

    #[test]
    fn cell_ref_builds_a1_references() {
        assert_eq!(cell_ref("График", "Q", 25), "График!Q25");
    }

    #[test]
    fn flexible_date_parsing_accepts_worksheet_formats() {
        assert_eq!(parse_flex_date("03.12.2025"), Some(date(2025, 12, 3)));
        assert_eq!(parse_flex_date("03.12.25"), Some(date(2025, 12, 3)));
        assert_eq!(parse_flex_date("2025-12-03"), Some(date(2025, 12, 3)));
        assert_eq!(parse_flex_date("  01.01.2025 "), Some(date(2025, 1, 1)));
        assert_eq!(parse_flex_date(""), None);
        assert_eq!(parse_flex_date("nan"), None);
        assert_eq!(parse_flex_date("31.02.2025"), None);
    }

    #[test]
    fn strict_date_parsing_rejects_short_years() {
        assert_eq!(parse_date_dmy("03.12.2025"), Some(date(2025, 12, 3)));
        assert_eq!(parse_date_dmy("03.12.25"), None);
        assert_eq!(parse_date_dmy("2025-12-03"), None);
    }

    #[test]
    fn mark_cells_normalize_case_and_nan() {
        assert_eq!(MarkCell::classify(" Да "), MarkCell::Yes);
        assert_eq!(MarkCell::classify("НЕТ"), MarkCell::No);
        assert_eq!(MarkCell::classify(""), MarkCell::Empty);
        assert_eq!(MarkCell::classify("nan"), MarkCell::Empty);
        assert_eq!(MarkCell::classify("в работе"), MarkCell::Other);
    }

    #[test]
    fn classification_prefers_unresolved() {
        use MarkCell::{Empty, No, Other, Yes};

        assert_eq!(RemarkCategory::classify([Yes, No, Empty, Empty]), Some(RemarkCategory::Unresolved));
        assert_eq!(RemarkCategory::classify([Yes, Empty, Empty, Empty]), Some(RemarkCategory::Resolved));
        assert_eq!(
            RemarkCategory::classify([Empty, Empty, Empty, Empty]),
            Some(RemarkCategory::NotRequired)
        );
        assert_eq!(RemarkCategory::classify([Other, Empty, Empty, Empty]), None);
        assert_eq!(RemarkCategory::classify([Other, Yes, Empty, Empty]), Some(RemarkCategory::Resolved));
    }

    #[test]
    fn remark_rows_tolerate_short_cell_arrays() {
        let row = RemarkRow::from_cells(7, &cells(&[("B", "01.06.2025"), ("D", "5")]));
        assert_eq!(row.row, 7);
        assert_eq!(row.date, Some(date(2025, 6, 1)));
        assert_eq!(row.district, "5");
        assert_eq!(row.electrical.mark, "");
        assert_eq!(row.category(), Some(RemarkCategory::NotRequired));
    }

    #[test]
    fn remark_parsing_reads_every_block() {
        let row = RemarkRow::from_cells(
            2,
            &cells(&[
                ("B", "15.05.2025"),
                ("D", "3"),
                ("F", "ЖК «Север»"),
                ("O", "4"),
                ("Q", "нет"),
                ("R", "да"),
                ("V", "1"),
                ("Y", "да"),
                ("AC", "2"),
                ("AD", "нет"),
                ("AH", "повторная проверка в июне"),
            ]),
        );

        assert_eq!(row.fire.violations, "4");
        assert_eq!(row.architecture.ar_violations, "1");
        assert_eq!(row.electrical.violations, "2");
        assert_eq!(row.common_note, "повторная проверка в июне");
        assert_eq!(row.category(), Some(RemarkCategory::Unresolved));
    }

    #[test]
    fn schedule_dump_skips_header_and_numbers_rows() {
        let dump = vec![
            SCHEDULE_HEADER.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "1".to_string(),
                "10.07.2025".to_string(),
                "Площадь: 100; этажность: 2".to_string(),
                "4".to_string(),
            ],
        ];
        let entries = parse_schedule(&dump);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].row, 2);
        assert_eq!(entries[0].district, "4");
        assert_eq!(entries[0].date, Some(date(2025, 7, 10)));
    }

    #[test]
    fn upcoming_visits_sort_and_drop_past_and_undated() {
        let mut past = ScheduleEntry::from_cells(2, &[]);
        past.date = Some(date(2025, 1, 1));
        let mut later = ScheduleEntry::from_cells(3, &[]);
        later.date = Some(date(2025, 9, 1));
        let mut sooner = ScheduleEntry::from_cells(4, &[]);
        sooner.date = Some(date(2025, 8, 1));
        let undated = ScheduleEntry::from_cells(5, &[]);

        let entries = vec![past, later, sooner, undated];
        let upcoming = upcoming_visits(&entries, date(2025, 6, 1));
        let rows: Vec<u32> = upcoming.iter().map(|entry| entry.row).collect();
        assert_eq!(rows, vec![4, 3]);
    }

    #[test]
    fn final_visits_match_substring_case_insensitively() {
        let mut entry = ScheduleEntry::from_cells(2, &[]);
        entry.date = Some(date(2025, 9, 1));
        entry.check_type = "Итоговая проверка".to_string();
        let mut other = ScheduleEntry::from_cells(3, &[]);
        other.date = Some(date(2025, 9, 2));
        other.check_type = "профвизит".to_string();

        let entries = vec![entry, other];
        let finals = upcoming_final_visits(&entries, date(2025, 6, 1));
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].row, 2);
    }

    #[test]
    fn bounded_periods_exclude_undated_rows() {
        let today = date(2025, 8, 29);
        let period = Period::last_days(today, 30);

        assert!(period.contains(Some(date(2025, 8, 10))));
        assert!(!period.contains(Some(date(2025, 6, 1))));
        assert!(!period.contains(None));
        assert!(Period::all().contains(None));
    }

    #[test]
    fn custom_period_parsing_handles_dashes_and_order() {
        let expected = Some((date(2025, 1, 1), date(2025, 1, 31)));
        assert_eq!(parse_period_range("01.01.2025-31.01.2025"), expected);
        assert_eq!(parse_period_range("01.01.2025—31.01.2025"), expected);
        assert_eq!(parse_period_range("31.01.2025-01.01.2025"), expected);
        assert_eq!(parse_period_range("01.01.2025"), None);
        assert_eq!(parse_period_range("january-february"), None);
    }

    #[test]
    fn wizard_walks_all_nine_steps() {
        let mut wizard = VisitWizard::new();

        assert!(matches!(wizard.feed("не дата"), WizardOutcome::Retry(_)));
        assert!(matches!(wizard.feed("03.12.2025"), WizardOutcome::Prompt(_)));
        for answer in ["1200", "17", "5", "ООО «Строй»", "ЖК «Север»", "ул. Ленина, 1", "77-01-123456"] {
            assert!(matches!(wizard.feed(answer), WizardOutcome::Prompt(_)));
        }

        let WizardOutcome::Complete(form) = wizard.feed("итоговая") else {
            panic!("wizard should complete after the ninth answer");
        };
        assert_eq!(form.date, date(2025, 12, 3));
        assert_eq!(form.check_type, "итоговая");

        let row = form.to_row(14, "Иванов И.И.");
        assert_eq!(row.len(), 10);
        assert_eq!(row[0], "14");
        assert_eq!(row[1], "03.12.2025");
        assert_eq!(row[2], "Площадь: 1200; этажность: 17");
        assert_eq!(row[9], "Иванов И.И.");
    }

    #[test]
    fn menu_labels_parse_case_insensitively() {
        assert_eq!(MenuAction::parse("📅 График"), Some(MenuAction::Schedule));
        assert_eq!(MenuAction::parse("📅 график"), Some(MenuAction::Schedule));
        assert_eq!(MenuAction::parse("📈 АНАЛИТИКА"), Some(MenuAction::Analytics));
        assert_eq!(MenuAction::parse("привет"), None);
    }

    #[test]
    fn callback_grammar_round_trips() {
        let actions = [
            CallbackAction::RemarksFilter(RemarkCategory::Unresolved),
            CallbackAction::DistrictSelect(12),
            CallbackAction::DistrictPeriod { district: 5, choice: PeriodChoice::Days90 },
            CallbackAction::SetStatus {
                field: StatusField::Electrical,
                mark: Mark::No,
                row: 40,
            },
            CallbackAction::Attach { district: 5, row: 25 },
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
        }
    }

    #[test]
    fn callback_grammar_matches_legacy_wire_format() {
        assert_eq!(
            CallbackAction::parse("remarks_not_done"),
            Some(CallbackAction::RemarksFilter(RemarkCategory::Unresolved))
        );
        assert_eq!(
            CallbackAction::parse("status_pbzk_yes_25"),
            Some(CallbackAction::SetStatus {
                field: StatusField::FireRegistry,
                mark: Mark::Yes,
                row: 25,
            })
        );
        assert_eq!(
            CallbackAction::parse("onzs_period_7_custom"),
            Some(CallbackAction::DistrictPeriod { district: 7, choice: PeriodChoice::Custom })
        );
        assert_eq!(CallbackAction::parse("status_pb_maybe_25"), None);
        assert_eq!(CallbackAction::parse("onzs_select_abc"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }

    #[test]
    fn remark_summary_truncates_near_message_limit() {
        let mut rows = Vec::new();
        for index in 0..200 {
            let mut row = RemarkRow::from_cells(index + 2, &[]);
            row.fire.mark = "нет".to_string();
            row.object = "Объект с достаточно длинным названием для карточки".to_string();
            row.address = "г. Москва, улица Строителей, дом 25, корпус 3".to_string();
            rows.push(row);
        }

        let body = render::remark_summary(RemarkCategory::Unresolved, &rows);
        assert!(body.len() <= MESSAGE_SOFT_LIMIT);
        assert!(body.contains("Строка 2"));
    }

    #[test]
    fn remark_summary_reports_empty_categories() {
        let body = render::remark_summary(RemarkCategory::Resolved, &[]);
        assert!(body.contains("По текущему файлу таких строк нет."));
    }

    #[test]
    fn schedule_report_caps_at_ten_entries() {
        let mut entries = Vec::new();
        for day in 1..=15 {
            let mut entry = ScheduleEntry::from_cells(u32::from(day) + 1, &[]);
            entry.date = Some(date(2025, 9, day));
            entry.check_type = "ПП".to_string();
            entries.push(entry);
        }
        let refs: Vec<&ScheduleEntry> = entries.iter().collect();
        let body = render::schedule_report(&refs);
        assert_eq!(body.matches("• ").count(), 10);
    }

    #[test]
    fn analytics_report_renders_counts_and_history() {
        let summary = AnalyticsSummary {
            fire: StatusTally { yes: 3, no: 1 },
            attachments_total: 7,
            recent: vec![StatusChange {
                sheet_row: 25,
                fire: Some(Mark::Yes),
                fire_registry: None,
                architecture: None,
                electrical: None,
                updated_by_id: 100,
                updated_by_username: "inspector".to_string(),
                updated_at: match OffsetDateTime::from_unix_timestamp(1_756_000_000) {
                    Ok(at) => at,
                    Err(err) => panic!("bad timestamp in test fixture: {err}"),
                },
            }],
            ..AnalyticsSummary::default()
        };

        let body = render::analytics_report(&summary);
        assert!(body.contains("• ПБ: да = 3, нет = 1"));
        assert!(body.contains("Всего прикреплённых файлов: 7"));
        assert!(body.contains("Строка 25 — ПБ=да"));
        assert!(body.contains("изменил inspector"));
    }

    #[test]
    fn analytics_report_without_history_shows_placeholder() {
        let body = render::analytics_report(&AnalyticsSummary::default());
        assert!(body.contains("• пока нет данных по изменениям"));
    }
}
