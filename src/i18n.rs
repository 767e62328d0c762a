/*
Message catalogue for attendee-facing text.

- Embedded JA/EN JSON maps, parsed once on first use.
- `tr` looks a key up for a language with `{name}` placeholder substitution.
- `t` / `t_with` use DEFAULT_LANG.

Error messages returned by the API and every email body go through here so the
copy lives in one place.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "ja";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const JA_JSON: &str = r#"
{
  "booking.seminar_not_found": "セミナーが見つかりません",
  "booking.not_open": "このセミナーは現在予約を受け付けていません",
  "booking.full": "定員に達したため予約できません",
  "booking.members_only": "このセミナーは会員限定です。会員企業のメールアドレスまたは招待コードをご利用ください",
  "booking.duplicate": "このメールアドレスでは既に予約済みです",
  "reservation.not_found": "予約が見つかりません。予約番号とメールアドレスをご確認ください",
  "reservation.already_cancelled": "この予約は既にキャンセルされています",
  "reservation.not_editable": "この予約は変更できません",
  "validation.name_required": "お名前を入力してください",
  "validation.email_invalid": "メールアドレスの形式が正しくありません",
  "validation.participation_method": "参加方法が選択できない値です",
  "validation.title_required": "タイトルを入力してください",
  "validation.capacity": "定員は1以上で指定してください",
  "validation.date": "開催日時の形式が正しくありません",
  "validation.end_time": "終了日時は開催日時より後にしてください",
  "validation.url": "URLは http(s) で始まる必要があります: {field}",
  "validation.capacity_below_bookings": "定員を現在の予約数 ({count}) より少なくすることはできません",
  "validation.too_long": "{field} が長すぎます",
  "survey.already_submitted": "このアンケートは既に回答済みです",
  "survey.not_confirmed": "有効な予約がないためアンケートに回答できません",
  "survey.required": "必須項目に回答してください: {label}",
  "survey.out_of_range": "{label} は {min} から {max} の範囲で回答してください",
  "survey.invalid_option": "{label} の選択肢が正しくありません",
  "survey.too_long": "{label} の回答が長すぎます",
  "survey.invalid_questions": "設問の定義が正しくありません: {reason}",
  "survey.not_open": "このアンケートはまだ回答できません",
  "seminar.not_found": "セミナーが見つかりません",
  "seminar.cannot_publish": "中止または終了したセミナーは公開できません",
  "seminar.cannot_complete": "公開中のセミナーのみ終了にできます",
  "seminar.already_cancelled": "このセミナーは既に中止されています",
  "seminar.cannot_cancel": "終了したセミナーは中止できません",
  "seminar.cannot_edit": "中止または終了したセミナーは編集できません",
  "member_domain.invalid": "ドメインの形式が正しくありません",
  "member_domain.duplicate": "このドメインは既に登録されています",
  "member_domain.not_found": "ドメインが見つかりません",
  "auth.tenant_mismatch": "このセッションでは指定された組織を操作できません",
  "auth.logged_out": "ログアウトしました",
  "tenant.unknown": "指定された組織が見つかりません",
  "email.greeting": "{name} 様",
  "email.label.seminar": "セミナー",
  "email.label.date": "日時",
  "email.label.number": "予約番号",
  "email.label.method": "参加方法",
  "email.label.meeting_url": "参加URL",
  "email.method.venue": "会場",
  "email.method.online": "オンライン",
  "email.manage_hint": "予約内容の確認・変更・キャンセルは以下のページから予約番号とメールアドレスで行えます。",
  "email.footer": "本メールは送信専用です。ご不明な点は主催者までお問い合わせください。",
  "email.confirmation.subject": "【予約確定】{title}",
  "email.confirmation.body": "以下の内容でセミナーのご予約を承りました。",
  "email.update.subject": "【予約内容変更】{title}",
  "email.update.body": "ご予約内容を以下の通り変更しました。",
  "email.cancellation.subject": "【予約キャンセル】{title}",
  "email.cancellation.body": "以下のご予約をキャンセルしました。",
  "email.seminar_cancelled.subject": "【開催中止】{title}",
  "email.seminar_cancelled.body": "誠に申し訳ございませんが、以下のセミナーは開催中止となりました。"
}
"#;

const EN_JSON: &str = r#"
{
  "booking.seminar_not_found": "Seminar not found",
  "booking.not_open": "This seminar is not accepting bookings",
  "booking.full": "This seminar is fully booked",
  "booking.members_only": "This seminar is for members only. Use your member company email address or an invitation code",
  "booking.duplicate": "This email address already has a booking for this seminar",
  "reservation.not_found": "Reservation not found. Check the reservation number and email address",
  "reservation.already_cancelled": "This reservation has already been cancelled",
  "reservation.not_editable": "This reservation can no longer be changed",
  "validation.name_required": "Name is required",
  "validation.email_invalid": "Email address is invalid",
  "validation.participation_method": "Participation method is not available for this seminar",
  "validation.title_required": "Title is required",
  "validation.capacity": "Capacity must be at least 1",
  "validation.date": "Date must be an RFC3339 timestamp",
  "validation.end_time": "End time must be after the start time",
  "validation.url": "URL must start with http(s): {field}",
  "validation.capacity_below_bookings": "Capacity cannot be lower than the current bookings ({count})",
  "validation.too_long": "{field} is too long",
  "survey.already_submitted": "This survey has already been submitted",
  "survey.not_confirmed": "Surveys are only available for active reservations",
  "survey.required": "Please answer the required question: {label}",
  "survey.out_of_range": "{label} must be between {min} and {max}",
  "survey.invalid_option": "{label} has an invalid choice",
  "survey.too_long": "The answer to {label} is too long",
  "survey.invalid_questions": "Invalid question definition: {reason}",
  "survey.not_open": "This survey is not open yet",
  "seminar.not_found": "Seminar not found",
  "seminar.cannot_publish": "Cancelled or completed seminars cannot be published",
  "seminar.cannot_complete": "Only published seminars can be completed",
  "seminar.already_cancelled": "This seminar has already been cancelled",
  "seminar.cannot_cancel": "Completed seminars cannot be cancelled",
  "seminar.cannot_edit": "Cancelled or completed seminars cannot be edited",
  "member_domain.invalid": "Domain is invalid",
  "member_domain.duplicate": "This domain is already registered",
  "member_domain.not_found": "Domain not found",
  "auth.tenant_mismatch": "This session is not valid for the requested organization",
  "auth.logged_out": "Logged out",
  "tenant.unknown": "Unknown organization",
  "email.greeting": "Dear {name},",
  "email.label.seminar": "Seminar",
  "email.label.date": "Date",
  "email.label.number": "Reservation number",
  "email.label.method": "Participation",
  "email.label.meeting_url": "Join URL",
  "email.method.venue": "At the venue",
  "email.method.online": "Online",
  "email.manage_hint": "You can review, change or cancel your reservation with your reservation number and email address here:",
  "email.footer": "This is an automated message. Please contact the organizer with any questions.",
  "email.confirmation.subject": "Booking confirmed: {title}",
  "email.confirmation.body": "Your booking has been confirmed.",
  "email.update.subject": "Booking updated: {title}",
  "email.update.body": "Your booking details have been updated.",
  "email.cancellation.subject": "Booking cancelled: {title}",
  "email.cancellation.body": "Your booking has been cancelled.",
  "email.seminar_cancelled.subject": "Seminar cancelled: {title}",
  "email.seminar_cancelled.body": "We are sorry to inform you that the following seminar has been cancelled."
}
"#;

fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    let ja_map: HashMap<String, String> = serde_json::from_str(JA_JSON).unwrap_or_else(|e| {
        panic!("failed to parse JA_JSON in i18n module: {}", e);
    });
    out.insert("ja".to_string(), ja_map);

    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    out
}

fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Normalize a language tag into a short, lowercase code (e.g. "en-US" -> "en").
pub fn normalize_language(lang: &str) -> String {
    lang.split('-').next().unwrap_or(lang).trim().to_lowercase()
}

pub fn is_supported_language(lang: &str) -> bool {
    translations().contains_key(lang)
}

/// Pick a supported language from an optional client value, defaulting to DEFAULT_LANG.
pub fn resolve_language(lang: Option<&str>) -> &'static str {
    match lang.map(normalize_language).as_deref() {
        Some("en") => "en",
        _ => DEFAULT_LANG,
    }
}

/// Translate `key` for `lang` (DEFAULT_LANG when `None`), substituting `{name}` params.
///
/// Falls back to the default language, then to the key itself.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        .unwrap_or_else(|| key.to_string());

    match params {
        Some(params) => params
            .iter()
            .fold(val, |s, (k, v)| s.replace(&format!("{{{}}}", k), v)),
        None => val,
    }
}

pub fn t(key: &str) -> String {
    tr(None, key, None)
}

pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    tr(None, key, Some(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogues_have_the_same_keys() {
        let map = translations();
        let ja = &map["ja"];
        let en = &map["en"];
        for key in ja.keys() {
            assert!(en.contains_key(key), "missing en key {}", key);
        }
        assert_eq!(ja.len(), en.len());
    }

    #[test]
    fn auth_messages_are_the_ones_the_auth_routes_use() {
        let mut keys: Vec<&String> = translations()["en"]
            .keys()
            .filter(|k| k.starts_with("auth."))
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["auth.logged_out", "auth.tenant_mismatch"]);
    }

    #[test]
    fn params_are_substituted() {
        let s = tr(
            Some("en"),
            "survey.out_of_range",
            Some(&[("label", "Satisfaction"), ("min", "1"), ("max", "5")]),
        );
        assert_eq!(s, "Satisfaction must be between 1 and 5");
    }

    #[test]
    fn unknown_language_falls_back_to_default() {
        assert_eq!(tr(Some("fr"), "booking.full", None), t("booking.full"));
    }

    #[test]
    fn missing_key_returns_key() {
        assert_eq!(t("non.existent.key"), "non.existent.key");
    }

    #[test]
    fn language_resolution() {
        assert_eq!(resolve_language(Some("en-US")), "en");
        assert_eq!(resolve_language(Some("EN")), "en");
        assert_eq!(resolve_language(Some("fr")), "ja");
        assert_eq!(resolve_language(None), "ja");
        assert!(is_supported_language("ja"));
        assert!(!is_supported_language("fr"));
    }
}
