use benchmarx_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use benchmarx_core::repo::vendor_repo::{SqliteVendorRepository, VendorRepository};
use benchmarx_core::{
    open_db_in_memory, Attack, AttackCategory, RepoError, Severity, ValidationError, Vendor,
    VendorType,
};
use chrono::NaiveDate;
use uuid::Uuid;

#[test]
fn vendor_create_get_and_update_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVendorRepository::try_new(&conn).unwrap();

    let mut vendor = Vendor::new("CrowdStrike Falcon", VendorType::Edr);
    vendor.test_version = Some("7.10".to_string());
    vendor.test_date = NaiveDate::from_ymd_opt(2024, 5, 2);
    let id = repo.create_vendor(&vendor).unwrap();

    let loaded = repo.get_vendor(id).unwrap().unwrap();
    assert_eq!(loaded, vendor);

    vendor.vendor_type = VendorType::Xdr;
    vendor.description = Some("cloud console".to_string());
    repo.update_vendor(&vendor).unwrap();
    assert_eq!(repo.get_vendor(id).unwrap().unwrap().vendor_type, VendorType::Xdr);
}

#[test]
fn vendor_names_are_unique_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVendorRepository::try_new(&conn).unwrap();

    repo.create_vendor(&Vendor::new("SentinelOne", VendorType::Edr))
        .unwrap();
    let err = repo
        .create_vendor(&Vendor::new("sentinelone", VendorType::Xdr))
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    let found = repo.find_vendor_by_name("SENTINELONE").unwrap().unwrap();
    assert_eq!(found.name, "SentinelOne");
}

#[test]
fn vendors_list_by_name_and_count() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVendorRepository::try_new(&conn).unwrap();

    for name in ["Sophos", "bitdefender", "ESET"] {
        repo.create_vendor(&Vendor::new(name, VendorType::Epp))
            .unwrap();
    }

    let names: Vec<String> = repo
        .list_vendors()
        .unwrap()
        .into_iter()
        .map(|vendor| vendor.name)
        .collect();
    assert_eq!(names, vec!["bitdefender", "ESET", "Sophos"]);
    assert_eq!(repo.count_vendors().unwrap(), 3);
}

#[test]
fn update_of_unknown_vendor_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVendorRepository::try_new(&conn).unwrap();

    let err = repo
        .update_vendor(&Vendor::new("Ghost", VendorType::Other))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "vendor", .. }));
}

#[test]
fn blank_vendor_name_is_rejected_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVendorRepository::try_new(&conn).unwrap();

    let err = repo
        .create_vendor(&Vendor::new("   ", VendorType::Edr))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyField("name"))
    ));
}

#[test]
fn attacks_list_with_category_names_in_category_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let persistence = repo
        .create_category(&AttackCategory::new("Persistence"))
        .unwrap();
    let execution = repo
        .create_category(&AttackCategory::new("Execution"))
        .unwrap();
    repo.create_attack(&Attack::new("Scheduled Task", persistence, Severity::Low))
        .unwrap();
    repo.create_attack(&Attack::new("Registry Run Key", persistence, Severity::High))
        .unwrap();
    repo.create_attack(&Attack::new("WMI Exec", execution, Severity::Critical))
        .unwrap();

    let listing = repo.list_attacks().unwrap();
    let rows: Vec<(&str, &str)> = listing
        .iter()
        .map(|item| (item.category_name.as_str(), item.attack.name.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Execution", "WMI Exec"),
            ("Persistence", "Registry Run Key"),
            ("Persistence", "Scheduled Task"),
        ]
    );
    assert_eq!(repo.count_attacks().unwrap(), 3);

    let categories: Vec<String> = repo
        .list_categories()
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(categories, vec!["Execution", "Persistence"]);
}

#[test]
fn attack_lookup_by_name_carries_category() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let mut category = AttackCategory::new("Credential Access");
    category.mitre_tactic = Some("TA0006".to_string());
    let category_id = repo.create_category(&category).unwrap();
    let mut attack = Attack::new("LSASS Dump", category_id, Severity::Critical);
    attack.mitre_technique_id = Some("T1003.001".to_string());
    let attack_id = repo.create_attack(&attack).unwrap();

    let listing = repo.find_attack_by_name("lsass dump").unwrap().unwrap();
    assert_eq!(listing.attack.id, attack_id);
    assert_eq!(listing.category_name, "Credential Access");
    assert_eq!(listing.mitre_tactic.as_deref(), Some("TA0006"));
    assert_eq!(repo.get_attack(attack_id).unwrap().unwrap(), listing);
}

#[test]
fn malformed_technique_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    let category_id = repo
        .create_category(&AttackCategory::new("Execution"))
        .unwrap();

    let mut attack = Attack::new("Bad Id", category_id, Severity::Low);
    attack.mitre_technique_id = Some("1059".to_string());
    let err = repo.create_attack(&attack).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidTechniqueId(_))
    ));
}

#[test]
fn attack_with_unknown_category_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let err = repo
        .create_attack(&Attack::new("Orphan", Uuid::new_v4(), Severity::Low))
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));
}
