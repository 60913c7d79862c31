use chrono::{TimeZone, Utc};
use talent_intake::workflows::intake::{
    to_payload, ApplicationFormData, ApplicationId, ApplicationRecord, ApplicationStatus,
};
use talent_intake::workflows::review::export::load_records;
use talent_intake::workflows::review::{write_csv, ReviewBoard, StatusFilter, EXPORT_HEADERS};

fn dumped(id: &str, name: &str, status: ApplicationStatus, hour: u32) -> ApplicationRecord {
    let created_at = Utc
        .with_ymd_and_hms(2025, 5, 10, hour, 30, 0)
        .single()
        .expect("timestamp");
    let form = ApplicationFormData {
        full_name: name.to_string(),
        email: format!("{}@example.org", id),
        course: "Sistemas de Informação".to_string(),
        interest_areas: vec![
            "Redes e Infraestrutura".to_string(),
            "Projetos / Inovação".to_string(),
        ],
        lgpd_consent: true,
        ..ApplicationFormData::default()
    };
    ApplicationRecord {
        id: ApplicationId(id.to_string()),
        payload: to_payload(&form, None, None, created_at),
        status,
        created_at,
        updated_at: created_at,
    }
}

#[test]
fn table_dump_exports_the_selected_tab() {
    let dump = serde_json::to_string(&vec![
        dumped("a1", "Ana", ApplicationStatus::Approved, 10),
        dumped("a2", "Davi", ApplicationStatus::Pending, 1),
        dumped("a3", "Elis", ApplicationStatus::Approved, 14),
    ])
    .expect("dump");

    let records = load_records(dump.as_bytes()).expect("load");
    let board = ReviewBoard::new(records);
    let approved = board.filtered(StatusFilter::Only(ApplicationStatus::Approved), "");

    let mut out = Vec::new();
    write_csv(approved, &mut out).expect("csv");
    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();

    let header: Vec<String> = EXPORT_HEADERS.iter().map(|h| format!("\"{h}\"")).collect();
    assert_eq!(lines[0], header.join(","));
    assert_eq!(lines.len(), 3);
    // newest first
    assert!(lines[1].starts_with("\"Elis\""));
    assert!(lines[2].starts_with("\"Ana\""));
    assert!(lines[1].contains("\"Redes e Infraestrutura; Projetos / Inovação\""));
    assert!(lines[1].contains("\"Aprovado\""));
}

#[test]
fn registration_day_is_shown_in_brasilia_time() {
    let early = dumped("a2", "Davi", ApplicationStatus::Pending, 1);
    let board = ReviewBoard::new(vec![early]);

    let mut out = Vec::new();
    write_csv(board.records(), &mut out).expect("csv");
    let text = String::from_utf8(out).expect("utf8");

    // 01:30 UTC is still the previous day at UTC-3
    assert!(text.contains("\"09/05/2025\""));
}
