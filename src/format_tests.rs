use super::*;
use rand::Rng;

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[test]
fn currency_groups_thousands_with_dots() {
    assert_eq!(format_currency(150_000), "Rp 150.000");
    assert_eq!(format_currency(1_000_000), "Rp 1.000.000");
    assert_eq!(format_currency(28_400_000), "Rp 28.400.000");
}

#[test]
fn currency_small_amounts_have_no_separator() {
    assert_eq!(format_currency(0), "Rp 0");
    assert_eq!(format_currency(500), "Rp 500");
}

#[test]
fn currency_negative_keeps_sign_outside_prefix() {
    assert_eq!(format_currency(-150_000), "-Rp 150.000");
}

#[test]
fn date_uses_indonesian_month_names() {
    assert_eq!(format_date(d(2024, 8, 17)), "17 Agustus 2024");
    assert_eq!(format_date(d(2023, 12, 31)), "31 Desember 2023");
}

#[test]
fn date_day_is_not_zero_padded() {
    assert_eq!(format_date(d(2025, 1, 5)), "5 Januari 2025");
}

#[test]
fn date_time_appends_dotted_clock() {
    let dt = d(2024, 8, 17).and_hms_opt(14, 30, 0).unwrap();
    assert_eq!(format_date_time(dt), "17 Agustus 2024, 14.30");
}

#[test]
fn date_time_pads_hours_and_minutes() {
    let dt = d(2024, 8, 17).and_hms_opt(9, 5, 59).unwrap();
    assert_eq!(format_date_time(dt), "17 Agustus 2024, 09.05");
}

#[test]
fn phone_leading_zero_becomes_country_code() {
    assert_eq!(format_phone_number("081234567890"), "+6281234567890");
}

#[test]
fn phone_existing_country_code_is_kept() {
    assert_eq!(format_phone_number("6281234567890"), "+6281234567890");
}

#[test]
fn phone_punctuation_is_stripped() {
    assert_eq!(format_phone_number("+62 812-3456-7890"), "+6281234567890");
}

#[test]
fn phone_bare_national_number_gets_prefix() {
    assert_eq!(format_phone_number("81234567890"), "+6281234567890");
}

#[test]
fn phone_empty_input_yields_bare_prefix() {
    assert_eq!(format_phone_number(""), "+62");
}

#[test]
fn phone_arbitrary_input_always_normalizes() {
    let charset: Vec<char> = "0123456789 -()+.x".chars().collect();
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let len = rng.gen_range(0..20);
        let raw: String = (0..len).map(|_| charset[rng.gen_range(0..charset.len())]).collect();
        let formatted = format_phone_number(&raw);
        assert!(formatted.starts_with("+62"), "{:?} formatted to {:?}", raw, formatted);
        assert!(
            formatted[1..].chars().all(|c| c.is_ascii_digit()),
            "{:?} formatted to {:?}",
            raw,
            formatted
        );
    }
}

#[test]
fn invoice_pattern_accepts_prefix_and_six_digits() {
    assert!(validate_invoice_number("JRN-240501"));
    assert!(validate_invoice_number("JRN-000000"));
}

#[test]
fn invoice_pattern_rejects_malformed_numbers() {
    assert!(!validate_invoice_number("JRN-24051"));
    assert!(!validate_invoice_number("JRN-2405011"));
    assert!(!validate_invoice_number("ABC-240501"));
    assert!(!validate_invoice_number("jrn-240501"));
    assert!(!validate_invoice_number("JRN-24O501"));
    assert!(!validate_invoice_number(""));
}

#[test]
fn invoice_composition_encodes_year_month_serial() {
    assert_eq!(invoice_number_with(d(2024, 5, 12), 1), "JRN-240501");
    assert_eq!(invoice_number_with(d(2031, 12, 1), 99), "JRN-311299");
}

#[test]
fn generated_invoice_numbers_always_validate() {
    for _ in 0..100 {
        let invoice = generate_invoice_number();
        assert!(validate_invoice_number(&invoice), "generated {:?}", invoice);
    }
}

#[test]
fn payment_month_accepts_year_dash_month() {
    assert!(validate_payment_month("2024-05"));
    assert!(validate_payment_month("2024-12"));
    assert!(!validate_payment_month("2024-13"));
    assert!(!validate_payment_month("2024-00"));
    assert!(!validate_payment_month("24-05"));
    assert!(!validate_payment_month("2024-5"));
}

#[test]
fn month_of_pads_to_four_and_two_digits() {
    assert_eq!(month_of(d(2024, 5, 3)), "2024-05");
}

#[test]
fn status_without_payment_is_inactive() {
    assert_eq!(calculate_customer_status(None, 15, d(2024, 5, 20)), CustomerStatus::Inactive);
}

#[test]
fn status_paid_on_or_after_due_is_active() {
    assert_eq!(
        calculate_customer_status(Some(d(2024, 5, 15)), 15, d(2024, 5, 20)),
        CustomerStatus::Active
    );
    assert_eq!(
        calculate_customer_status(Some(d(2024, 5, 18)), 15, d(2024, 5, 20)),
        CustomerStatus::Active
    );
}

#[test]
fn status_within_thirty_days_behind_due_is_overdue() {
    // Paid on last month's due day: exactly 30 days behind.
    assert_eq!(
        calculate_customer_status(Some(d(2024, 4, 15)), 15, d(2024, 5, 20)),
        CustomerStatus::Overdue
    );
    // Today is the due date itself.
    assert_eq!(
        calculate_customer_status(Some(d(2024, 4, 20)), 15, d(2024, 5, 15)),
        CustomerStatus::Overdue
    );
}

#[test]
fn status_past_the_thirty_day_grace_is_inactive() {
    // 31 days behind the due date: one past the grace window.
    assert_eq!(
        calculate_customer_status(Some(d(2024, 4, 14)), 15, d(2024, 5, 20)),
        CustomerStatus::Inactive
    );
    // 40 days behind.
    assert_eq!(
        calculate_customer_status(Some(d(2024, 4, 22)), 1, d(2024, 6, 1)),
        CustomerStatus::Inactive
    );
}

#[test]
fn status_before_due_without_current_payment_is_overdue() {
    // Last payment predates this month's due date, which is still ahead.
    assert_eq!(
        calculate_customer_status(Some(d(2024, 4, 26)), 25, d(2024, 5, 5)),
        CustomerStatus::Overdue
    );
}

#[test]
fn due_day_clamps_to_month_end() {
    // Due day 31 falls on 30 April.
    assert_eq!(
        calculate_customer_status(Some(d(2024, 4, 30)), 31, d(2024, 4, 30)),
        CustomerStatus::Active
    );
    // Leap-year February clamps to the 29th.
    assert_eq!(
        calculate_customer_status(Some(d(2024, 2, 29)), 31, d(2024, 2, 29)),
        CustomerStatus::Active
    );
    assert_eq!(
        calculate_customer_status(Some(d(2024, 2, 1)), 31, d(2024, 2, 29)),
        CustomerStatus::Overdue
    );
}

#[test]
fn status_categories_follow_record_status() {
    assert_eq!(status_category("active"), StatusCategory::Success);
    assert_eq!(status_category("verified"), StatusCategory::Success);
    assert_eq!(status_category("resolved"), StatusCategory::Success);
    assert_eq!(status_category("overdue"), StatusCategory::Warning);
    assert_eq!(status_category("pending"), StatusCategory::Warning);
    assert_eq!(status_category("in_progress"), StatusCategory::Warning);
    assert_eq!(status_category("inactive"), StatusCategory::Danger);
    assert_eq!(status_category("rejected"), StatusCategory::Danger);
    assert_eq!(status_category("open"), StatusCategory::Info);
    assert_eq!(status_category("closed"), StatusCategory::Neutral);
}

#[test]
fn unknown_status_is_neutral() {
    assert_eq!(status_category("archived"), StatusCategory::Neutral);
    assert_eq!(status_category(""), StatusCategory::Neutral);
}

#[test]
fn status_category_css_classes() {
    assert_eq!(StatusCategory::Success.css_class(), "text-green-600 bg-green-50");
    assert_eq!(StatusCategory::Warning.css_class(), "text-yellow-600 bg-yellow-50");
    assert_eq!(StatusCategory::Danger.css_class(), "text-red-600 bg-red-50");
    assert_eq!(StatusCategory::Info.css_class(), "text-blue-600 bg-blue-50");
    assert_eq!(StatusCategory::Neutral.css_class(), "text-gray-600 bg-gray-50");
}

#[test]
fn maps_url_embeds_coordinates() {
    assert_eq!(maps_url(-6.2, 106.81), "https://www.google.com/maps?q=-6.2,106.81");
}
