//! Update dispatcher: routes messages and callback presses to the section
//! handlers and keeps per-chat conversation state.

use std::collections::HashMap;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use sotbot_core::{
    department_today, main_menu_rows, parse_period_range, parse_remark_rows, parse_schedule,
    render, upcoming_final_visits, upcoming_visits, CallbackAction, Mark, MenuAction, Period,
    PeriodChoice, RemarkCategory, RemarkRow, ScheduleEntry, StatusField, VisitForm, VisitWizard,
    WizardOutcome, SCHEDULE_HEADER,
};
use sotbot_google::{DriveClient, GoogleError, SheetsClient};
use sotbot_store_sqlite::SqliteStore;
use sotbot_telegram::{
    BotClient, CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message,
    ReplyKeyboardMarkup, ReplyMarkup, TelegramError, Update, User,
};

const FALLBACK_TEXT: &str = "Выберите действие из меню.";
const GREETING: &str = "Привет! Я рабочий бот отдела СОТ.\nВыберите раздел:";

#[derive(Debug, Clone, Copy)]
struct PendingAttachment {
    district: u8,
    sheet_row: u32,
}

/// Conversation state for one chat. Everything here is transient and lost
/// on restart, which matches how the sections behave.
#[derive(Debug, Default)]
struct Session {
    wizard: Option<VisitWizard>,
    awaiting_period_for: Option<u8>,
    awaiting_password: bool,
    pending_attachment: Option<PendingAttachment>,
}

pub struct App {
    bot: BotClient,
    sheets: SheetsClient,
    drive: DriveClient,
    store: SqliteStore,
    sessions: HashMap<i64, Session>,
    remarks_sheet: String,
    schedule_sheet: String,
    analytics_password: String,
}

impl App {
    pub fn new(
        bot: BotClient,
        sheets: SheetsClient,
        drive: DriveClient,
        store: SqliteStore,
        remarks_sheet: String,
        schedule_sheet: String,
        analytics_password: String,
    ) -> Self {
        Self {
            bot,
            sheets,
            drive,
            store,
            sessions: HashMap::new(),
            remarks_sheet,
            schedule_sheet,
            analytics_password,
        }
    }

    pub fn bot(&self) -> &BotClient {
        &self.bot
    }

    pub async fn handle_update(&mut self, update: Update) -> Result<()> {
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }
        if let Some(query) = update.callback_query {
            return self.handle_callback(query).await;
        }
        Ok(())
    }

    async fn handle_message(&mut self, message: Message) -> Result<()> {
        let chat_id = message.chat.id;
        let Some(user) = message.from.clone() else {
            return Ok(());
        };

        if message.document.is_some() || !message.photo.is_empty() {
            return self.handle_file_message(chat_id, &user, &message).await;
        }

        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };

        if text.trim() == "/start" {
            self.store
                .ensure_user(user.id, &user.display_name(), OffsetDateTime::now_utc())
                .context("failed to register user")?;
            self.bot
                .send_message(chat_id, GREETING, Some(main_menu_markup()))
                .await?;
            return Ok(());
        }

        if text.trim() == "/id" {
            self.bot.send_message(chat_id, &id_reply(&user), None).await?;
            return Ok(());
        }

        self.handle_text(chat_id, &user, text).await
    }

    /// Text routing priority: an active wizard, then a pending custom
    /// period, then a pending analytics password, then the main menu.
    async fn handle_text(&mut self, chat_id: i64, user: &User, text: &str) -> Result<()> {
        let wizard_outcome = {
            let session = self.session_mut(chat_id);
            session.wizard.as_mut().map(|wizard| wizard.feed(text))
        };
        if let Some(outcome) = wizard_outcome {
            return self.handle_wizard_outcome(chat_id, user, outcome).await;
        }

        if let Some(district) = self.session_mut(chat_id).awaiting_period_for {
            if let Some((from, to)) = parse_period_range(text) {
                self.session_mut(chat_id).awaiting_period_for = None;
                return self
                    .send_district_cards(chat_id, district, Period::range(from, to))
                    .await;
            }
            self.bot
                .send_message(
                    chat_id,
                    "Не понял формат. Нужен вид ДД.ММ.ГГГГ-ДД.ММ.ГГГГ.\nНапример: 01.01.2025-31.01.2025",
                    None,
                )
                .await?;
            return Ok(());
        }

        if self.session_mut(chat_id).awaiting_password {
            self.session_mut(chat_id).awaiting_password = false;
            if text.trim() == self.analytics_password {
                return self.send_analytics(chat_id).await;
            }
            self.bot.send_message(chat_id, "Неверный пароль.", None).await?;
            return Ok(());
        }

        match MenuAction::parse(text) {
            Some(action) => self.handle_menu(chat_id, action).await,
            None => {
                self.bot
                    .send_message(chat_id, FALLBACK_TEXT, Some(main_menu_markup()))
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_menu(&mut self, chat_id: i64, action: MenuAction) -> Result<()> {
        match action {
            MenuAction::Schedule => {
                let entries = self.fetch_schedule().await;
                let upcoming = upcoming_visits(&entries, department_today());
                let report = render::schedule_report(&upcoming);
                self.bot.send_message(chat_id, &report, None).await?;
            }
            MenuAction::FinalInspections => {
                let entries = self.fetch_schedule().await;
                let finals = upcoming_final_visits(&entries, department_today());
                let report = render::final_report(&finals);
                self.bot.send_message(chat_id, &report, None).await?;
            }
            MenuAction::Remarks => {
                let intro = format!(
                    "Раздел «📝 Замечания».\nДанные берутся из листа Google Sheets «{}».\nВыберите категорию:",
                    self.remarks_sheet
                );
                self.bot
                    .send_message(
                        chat_id,
                        &intro,
                        Some(ReplyMarkup::Inline(remarks_filter_keyboard())),
                    )
                    .await?;
            }
            MenuAction::Districts => {
                self.bot
                    .send_message(
                        chat_id,
                        "Раздел «🏗 ОНзС».\nВыберите номер ОНзС:",
                        Some(ReplyMarkup::Inline(district_keyboard())),
                    )
                    .await?;
            }
            MenuAction::Inspector => {
                self.session_mut(chat_id).wizard = Some(VisitWizard::new());
                self.bot.send_message(chat_id, VisitWizard::intro(), None).await?;
            }
            MenuAction::Analytics => {
                self.session_mut(chat_id).awaiting_password = true;
                self.bot
                    .send_message(
                        chat_id,
                        "Введите пароль для входа в раздел «📈 Аналитика»:",
                        None,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn handle_wizard_outcome(
        &mut self,
        chat_id: i64,
        user: &User,
        outcome: WizardOutcome,
    ) -> Result<()> {
        match outcome {
            WizardOutcome::Prompt(prompt) | WizardOutcome::Retry(prompt) => {
                self.bot.send_message(chat_id, prompt, None).await?;
            }
            WizardOutcome::Complete(form) => {
                self.session_mut(chat_id).wizard = None;
                self.save_visit(chat_id, &form, &user.display_name()).await?;
            }
        }
        Ok(())
    }

    /// Appends the collected visit to the schedule worksheet, writing the
    /// header first when the sheet is still empty.
    async fn save_visit(&mut self, chat_id: i64, form: &VisitForm, inspector: &str) -> Result<()> {
        let range = format!("{}!A:J", self.schedule_sheet);
        let rows = self.sheets.get_values(&range).await.context("failed to read schedule")?;

        if rows.is_empty() {
            let header: Vec<String> = SCHEDULE_HEADER.iter().map(ToString::to_string).collect();
            self.sheets
                .append_row(&self.schedule_sheet, &header)
                .await
                .context("failed to write schedule header")?;
        }

        // The header occupies row 1, so the row count doubles as the next
        // serial number.
        let serial = u32::try_from(rows.len().max(1)).unwrap_or(u32::MAX);
        let row = form.to_row(serial, inspector);
        self.sheets
            .append_row(&self.schedule_sheet, &row)
            .await
            .context("failed to append visit")?;

        tracing::info!(serial, "visit saved to schedule");
        let reply = format!(
            "Выезд сохранён в Google Sheets на лист «{}».\n№ п/п: {serial}",
            self.schedule_sheet
        );
        self.bot
            .send_message(chat_id, &reply, Some(main_menu_markup()))
            .await?;
        Ok(())
    }

    async fn handle_callback(&mut self, query: CallbackQuery) -> Result<()> {
        self.bot.answer_callback_query(&query.id).await?;

        let Some(data) = query.data.as_deref() else {
            return Ok(());
        };
        let Some(action) = CallbackAction::parse(data) else {
            tracing::debug!(data, "ignoring unknown callback data");
            return Ok(());
        };
        let Some(message) = query.message else {
            return Ok(());
        };
        let chat_id = message.chat.id;

        match action {
            CallbackAction::RemarksFilter(category) => {
                self.show_remarks_filter(chat_id, message.message_id, category).await?;
            }
            CallbackAction::DistrictSelect(district) => {
                self.edit_ignoring_unmodified(
                    chat_id,
                    message.message_id,
                    &format!("ОНзС {district}. Выберите период:"),
                    Some(period_keyboard(district)),
                )
                .await?;
            }
            CallbackAction::DistrictPeriod { district, choice } => {
                self.handle_district_period(chat_id, district, choice).await?;
            }
            CallbackAction::SetStatus { field, mark, row } => {
                self.set_status(chat_id, &query.from, field, mark, row).await?;
            }
            CallbackAction::Attach { district, row } => {
                self.session_mut(chat_id).pending_attachment =
                    Some(PendingAttachment { district, sheet_row: row });
                let prompt = format!(
                    "Пришлите файл (фото или документ), который нужно привязать к ОНзС {district}, строка {row}."
                );
                self.bot.send_message(chat_id, &prompt, None).await?;
            }
        }
        Ok(())
    }

    async fn show_remarks_filter(
        &mut self,
        chat_id: i64,
        message_id: i64,
        category: RemarkCategory,
    ) -> Result<()> {
        let rows = self.fetch_remarks().await;
        let body = render::remark_summary(category, &rows);
        self.edit_ignoring_unmodified(chat_id, message_id, &body, Some(remarks_filter_keyboard()))
            .await
    }

    async fn handle_district_period(
        &mut self,
        chat_id: i64,
        district: u8,
        choice: PeriodChoice,
    ) -> Result<()> {
        let period = match choice {
            PeriodChoice::Days30 => Period::last_days(department_today(), 30),
            PeriodChoice::Days90 => Period::last_days(department_today(), 90),
            PeriodChoice::All => Period::all(),
            PeriodChoice::Custom => {
                self.session_mut(chat_id).awaiting_period_for = Some(district);
                let prompt = format!(
                    "Введите период для ОНзС {district} в формате ДД.ММ.ГГГГ-ДД.ММ.ГГГГ\nНапример: 01.01.2025-31.01.2025"
                );
                self.bot.send_message(chat_id, &prompt, None).await?;
                return Ok(());
            }
        };
        self.send_district_cards(chat_id, district, period).await
    }

    /// Sends one full card per matching worksheet row, each with its own
    /// status and attachment buttons.
    async fn send_district_cards(
        &mut self,
        chat_id: i64,
        district: u8,
        period: Period,
    ) -> Result<()> {
        let notice = format!("Показываю объекты по ОНзС {district} за выбранный период...");
        self.bot.send_message(chat_id, &notice, None).await?;

        let rows = self.fetch_remarks().await;
        let matching = district_rows(&rows, district, &period);

        if matching.is_empty() {
            let reply =
                format!("По ОНзС {district} в указанном периоде подходящих строк не найдено.");
            self.bot.send_message(chat_id, &reply, None).await?;
            return Ok(());
        }

        for row in matching {
            let card = render::remark_card(row);
            let keyboard = remark_keyboard(district, row.row);
            self.bot
                .send_message(chat_id, &card, Some(ReplyMarkup::Inline(keyboard)))
                .await?;
        }
        Ok(())
    }

    /// Writes a «да»/«нет» mark into the worksheet and mirrors the change
    /// into the local history.
    async fn set_status(
        &mut self,
        chat_id: i64,
        user: &User,
        field: StatusField,
        mark: Mark,
        row: u32,
    ) -> Result<()> {
        self.sheets
            .update_cell(&self.remarks_sheet, field.column(), row, mark.as_str())
            .await
            .context("failed to update status cell")?;
        self.store
            .record_status_change(
                row,
                field,
                mark,
                user.id,
                &user.display_name(),
                OffsetDateTime::now_utc(),
            )
            .context("failed to record status change")?;

        tracing::info!(row, field = field.code(), mark = mark.code(), "status updated");
        let reply = format!(
            "Статус по {} в строке {row} обновлён на «{}».",
            field.code().to_uppercase(),
            mark.as_str()
        );
        self.bot.send_message(chat_id, &reply, None).await?;
        Ok(())
    }

    async fn handle_file_message(
        &mut self,
        chat_id: i64,
        user: &User,
        message: &Message,
    ) -> Result<()> {
        let Some(pending) = self.session_mut(chat_id).pending_attachment.take() else {
            tracing::debug!(chat_id, "file received without a pending attachment, ignoring");
            return Ok(());
        };

        let (file_id, file_name) = if let Some(document) = &message.document {
            let name = document.file_name.clone().unwrap_or_else(default_file_name);
            (document.file_id.clone(), name)
        } else if let Some(photo) =
            message.photo.iter().max_by_key(|size| size.file_size.unwrap_or(0))
        {
            (photo.file_id.clone(), default_photo_name())
        } else {
            return Ok(());
        };

        let info = self.bot.get_file(&file_id).await?;
        let file_path = info
            .file_path
            .context("telegram did not return a file path")?;
        let bytes = self.bot.download_file(&file_path).await?;

        let folder = self
            .drive
            .ensure_row_folder(&pending.district.to_string(), pending.sheet_row)
            .await
            .context("failed to resolve drive folder")?;
        let url = self
            .drive
            .upload_public_file(&folder, &file_name, bytes)
            .await
            .context("failed to upload attachment")?;

        self.store
            .record_attachment(
                pending.sheet_row,
                &url,
                &file_name,
                user.id,
                OffsetDateTime::now_utc(),
            )
            .context("failed to record attachment")?;

        let reply = format!(
            "Файл загружен в Google Drive и привязан к строке {}.\nСсылка: {url}",
            pending.sheet_row
        );
        self.bot.send_message(chat_id, &reply, None).await?;
        Ok(())
    }

    async fn send_analytics(&mut self, chat_id: i64) -> Result<()> {
        let summary = self.store.analytics_summary().context("failed to build analytics")?;
        let report = render::analytics_report(&summary);
        self.bot.send_message(chat_id, &report, None).await?;
        Ok(())
    }

    /// Whole-sheet reads degrade to an empty list; the section renderers
    /// produce their "nothing found" texts and the user always gets a
    /// reply.
    async fn fetch_remarks(&self) -> Vec<RemarkRow> {
        let range = format!("{}!A:AZ", self.remarks_sheet);
        remarks_from_read(self.sheets.get_values(&range).await, &self.remarks_sheet)
    }

    async fn fetch_schedule(&self) -> Vec<ScheduleEntry> {
        let range = format!("{}!A:J", self.schedule_sheet);
        schedule_from_read(self.sheets.get_values(&range).await, &self.schedule_sheet)
    }

    /// Re-sending identical text makes Telegram reject the edit; that case
    /// is not an error for us.
    async fn edit_ignoring_unmodified(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        match self.bot.edit_message_text(chat_id, message_id, text, markup).await {
            Ok(()) => Ok(()),
            Err(TelegramError::Api(description)) if description.contains("not modified") => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn session_mut(&mut self, chat_id: i64) -> &mut Session {
        self.sessions.entry(chat_id).or_default()
    }
}

fn remarks_from_read(
    result: Result<Vec<Vec<String>>, GoogleError>,
    sheet: &str,
) -> Vec<RemarkRow> {
    match result {
        Ok(values) => parse_remark_rows(&values),
        Err(err) => {
            tracing::warn!(error = %err, sheet, "failed to read sheet, treating as empty");
            Vec::new()
        }
    }
}

fn schedule_from_read(
    result: Result<Vec<Vec<String>>, GoogleError>,
    sheet: &str,
) -> Vec<ScheduleEntry> {
    match result {
        Ok(values) => parse_schedule(&values),
        Err(err) => {
            tracing::warn!(error = %err, sheet, "failed to read sheet, treating as empty");
            Vec::new()
        }
    }
}

/// Every worksheet row for a district within a period, in sheet order.
fn district_rows<'a>(rows: &'a [RemarkRow], district: u8, period: &Period) -> Vec<&'a RemarkRow> {
    rows.iter()
        .filter(|row| district_number(&row.district) == Some(district))
        .filter(|row| period.contains(row.date))
        .collect()
}

fn id_reply(user: &User) -> String {
    let username = user
        .username
        .as_deref()
        .map_or_else(|| "нет".to_string(), |username| format!("@{username}"));
    format!("Ваш ID: {}\nВаш username: {username}", user.id)
}

/// First run of digits in a worksheet district cell («ОНзС 3», «3 округ»).
fn district_number(text: &str) -> Option<u8> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn default_file_name() -> String {
    format!("file_{}", OffsetDateTime::now_utc().unix_timestamp())
}

fn default_photo_name() -> String {
    format!("photo_{}.jpg", OffsetDateTime::now_utc().unix_timestamp())
}

fn main_menu_markup() -> ReplyMarkup {
    let rows = main_menu_rows();
    ReplyMarkup::Reply(ReplyKeyboardMarkup::from_labels(&[
        &rows[0][..],
        &rows[1][..],
        &rows[2][..],
    ]))
}

fn remarks_filter_keyboard() -> InlineKeyboardMarkup {
    let categories =
        [RemarkCategory::Resolved, RemarkCategory::Unresolved, RemarkCategory::NotRequired];
    InlineKeyboardMarkup {
        inline_keyboard: vec![categories
            .into_iter()
            .map(|category| {
                InlineKeyboardButton::new(
                    category.label(),
                    CallbackAction::RemarksFilter(category).encode(),
                )
            })
            .collect()],
    }
}

fn district_keyboard() -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    for chunk in (1..=12).collect::<Vec<u8>>().chunks(3) {
        rows.push(
            chunk
                .iter()
                .map(|district| {
                    InlineKeyboardButton::new(
                        format!("ОНзС {district}"),
                        CallbackAction::DistrictSelect(*district).encode(),
                    )
                })
                .collect(),
        );
    }
    InlineKeyboardMarkup { inline_keyboard: rows }
}

fn period_keyboard(district: u8) -> InlineKeyboardMarkup {
    let choice_button = |label: &str, choice: PeriodChoice| {
        InlineKeyboardButton::new(
            label,
            CallbackAction::DistrictPeriod { district, choice }.encode(),
        )
    };
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                choice_button("30 дней", PeriodChoice::Days30),
                choice_button("90 дней", PeriodChoice::Days90),
            ],
            vec![
                choice_button("Всё время", PeriodChoice::All),
                choice_button("Свой период", PeriodChoice::Custom),
            ],
        ],
    }
}

fn status_button_label(field: StatusField) -> &'static str {
    match field {
        StatusField::FireSafety => "ПБ",
        StatusField::FireRegistry => "ПБ ЗК КНД",
        StatusField::Architecture => "АР/ММГН/АГО",
        StatusField::Electrical => "ЭОМ",
    }
}

/// Status buttons for one worksheet row: per-discipline «да»/«нет» pairs
/// plus the attachment button.
fn remark_keyboard(district: u8, row: u32) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = StatusField::ALL
        .into_iter()
        .map(|field| {
            vec![
                InlineKeyboardButton::new(
                    format!("✔ {}", status_button_label(field)),
                    CallbackAction::SetStatus { field, mark: Mark::Yes, row }.encode(),
                ),
                InlineKeyboardButton::new(
                    format!("✖ {}", status_button_label(field)),
                    CallbackAction::SetStatus { field, mark: Mark::No, row }.encode(),
                ),
            ]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::new(
        "📎 Прикрепить файл",
        CallbackAction::Attach { district, row }.encode(),
    )]);
    InlineKeyboardMarkup { inline_keyboard: rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn district_numbers_come_from_the_first_digit_run() {
        assert_eq!(district_number("ОНзС 3"), Some(3));
        assert_eq!(district_number("12 округ"), Some(12));
        assert_eq!(district_number("без номера"), None);
    }

    #[test]
    fn district_keyboard_covers_all_twelve_districts() {
        let keyboard = district_keyboard();
        let buttons: Vec<&InlineKeyboardButton> =
            keyboard.inline_keyboard.iter().flatten().collect();
        assert_eq!(buttons.len(), 12);
        assert_eq!(buttons[0].callback_data, "onzs_select_1");
        assert_eq!(buttons[11].callback_data, "onzs_select_12");
    }

    #[test]
    fn remark_keyboard_has_a_button_pair_per_discipline() {
        let keyboard = remark_keyboard(4, 17);
        assert_eq!(keyboard.inline_keyboard.len(), 5);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "✔ ПБ");
        assert_eq!(keyboard.inline_keyboard[0][0].callback_data, "status_pb_yes_17");
        assert_eq!(keyboard.inline_keyboard[0][1].text, "✖ ПБ");
        assert_eq!(keyboard.inline_keyboard[0][1].callback_data, "status_pb_no_17");
        assert_eq!(keyboard.inline_keyboard[1][0].text, "✔ ПБ ЗК КНД");
        assert_eq!(keyboard.inline_keyboard[4][0].callback_data, "attach_onzs_4_17");
    }

    fn row_in_district(sheet_row: u32, district: &str) -> RemarkRow {
        let mut cells = vec![String::new(); 36];
        cells[3] = district.to_string();
        RemarkRow::from_cells(sheet_row, &cells)
    }

    #[test]
    fn district_rows_keep_every_match() {
        let mut rows: Vec<RemarkRow> =
            (2..=13).map(|sheet_row| row_in_district(sheet_row, "ОНзС 5")).collect();
        rows.push(row_in_district(14, "ОНзС 6"));

        let matching = district_rows(&rows, 5, &Period::all());
        assert_eq!(matching.len(), 12);
        assert_eq!(matching[0].row, 2);
        assert_eq!(matching[11].row, 13);
    }

    #[test]
    fn failed_sheet_reads_degrade_to_empty_lists() {
        let remarks =
            remarks_from_read(Err(GoogleError::Api("boom".to_string())), "Замечания");
        assert!(remarks.is_empty());

        let schedule =
            schedule_from_read(Err(GoogleError::Api("boom".to_string())), "График");
        assert!(schedule.is_empty());
    }

    #[test]
    fn successful_sheet_reads_still_parse() {
        let values = vec![
            vec!["шапка".to_string()],
            {
                let mut cells = vec![String::new(); 36];
                cells[3] = "ОНзС 2".to_string();
                cells
            },
        ];
        let rows = remarks_from_read(Ok(values), "Замечания");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 2);
    }

    #[test]
    fn id_reply_echoes_user_id_and_username() {
        let user = User {
            id: 99,
            username: Some("sot_user".to_string()),
            first_name: None,
            last_name: None,
        };
        assert_eq!(id_reply(&user), "Ваш ID: 99\nВаш username: @sot_user");

        let bare = User { id: 99, username: None, first_name: None, last_name: None };
        assert_eq!(id_reply(&bare), "Ваш ID: 99\nВаш username: нет");
    }

    #[test]
    fn period_keyboard_encodes_the_district() {
        let keyboard = period_keyboard(7);
        assert_eq!(keyboard.inline_keyboard[0][0].callback_data, "onzs_period_7_30");
        assert_eq!(keyboard.inline_keyboard[1][1].callback_data, "onzs_period_7_custom");
    }
}
