//! Network settings runs on both settings endpoints.

mod common;

use common::{doc, FakeController, CURRENT, LEGACY};
use netconv_engine::{Driver, Group, SessionCipher};
use pretty_assertions::assert_eq;

const HQ_SERVICES: &str = r"
config:
  network_management_details:
    - site_name: Global/HQ
      settings:
        dhcp_server: [10.0.0.5, 10.0.0.6]
        ntp_server: [10.0.0.7]
        timezone: GMT
";

#[tokio::test]
async fn writes_only_the_aspects_that_differ() {
    let fake = FakeController::new(CURRENT);
    let hq = fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();

    let report = Driver::new(&fake, &cipher).run(doc(HQ_SERVICES)).await;

    assert!(report.fatal().is_none());
    assert_eq!(
        report.group(Group::NetworkSettings).unwrap().updated,
        vec!["Global/HQ"]
    );
    assert_eq!(fake.writes(), vec!["set_dhcp", "set_ntp", "set_timezone"]);
    assert_eq!(fake.count("get_dns"), 0);
    let stored = fake.aspects(&hq);
    assert_eq!(stored.dhcp.servers, vec!["10.0.0.5", "10.0.0.6"]);
    assert_eq!(stored.timezone.identifier.as_deref(), Some("GMT"));
}

#[tokio::test]
async fn server_order_does_not_matter() {
    let fake = FakeController::new(CURRENT);
    fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();
    let driver = Driver::new(&fake, &cipher);
    driver.run(doc(HQ_SERVICES)).await;
    fake.clear_calls();

    let reordered = HQ_SERVICES.replace("[10.0.0.5, 10.0.0.6]", "[10.0.0.6, 10.0.0.5]");
    let report = driver.run(doc(&reordered)).await;

    assert!(!report.changed());
    assert!(fake.writes().is_empty());
}

#[tokio::test]
async fn null_clears_and_absence_preserves() {
    let fake = FakeController::new(CURRENT);
    let hq = fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();
    let driver = Driver::new(&fake, &cipher);
    driver.run(doc(HQ_SERVICES)).await;
    fake.clear_calls();

    let clear = r"
config:
  network_management_details:
    - site_name: Global/HQ
      settings:
        dhcp_server: null
";
    let report = driver.run(doc(clear)).await;

    assert!(report.changed());
    assert_eq!(fake.writes(), vec!["set_dhcp"]);
    let stored = fake.aspects(&hq);
    assert!(stored.dhcp.servers.is_empty());
    assert_eq!(stored.ntp.servers, vec!["10.0.0.7"]);
}

#[tokio::test]
async fn aaa_secret_is_not_compared() {
    let fake = FakeController::new(CURRENT);
    let hq = fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();
    let driver = Driver::new(&fake, &cipher);
    let input = r"
config:
  network_management_details:
    - site_name: Global/HQ
      settings:
        network_aaa:
          server_type: ISE
          protocol: RADIUS
          pan_address: 10.0.0.20
          primary_server_address: 10.0.0.21
          shared_secret: s3cr3t-key
";

    driver.run(doc(input)).await;
    let network = fake.aspects(&hq).aaa.aaa_network.unwrap();
    assert_eq!(network.server_type, "ISE");
    assert_eq!(network.pan.as_deref(), Some("10.0.0.20"));

    fake.clear_calls();
    let second = driver.run(doc(input)).await;
    assert!(!second.changed());
    assert!(fake.writes().is_empty());
}

#[tokio::test]
async fn legacy_controller_gets_one_combined_write() {
    let fake = FakeController::new(LEGACY);
    fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();
    let driver = Driver::new(&fake, &cipher);

    let first = driver.run(doc(HQ_SERVICES)).await;

    assert!(first.fatal().is_none());
    assert_eq!(fake.writes(), vec!["update_network_settings"]);
    assert_eq!(fake.count("get_dhcp"), 0);
    assert_eq!(
        first.group(Group::NetworkSettings).unwrap().updated,
        vec!["Global/HQ"]
    );

    fake.clear_calls();
    let second = driver.run(doc(HQ_SERVICES)).await;
    assert!(!second.changed());
    assert!(fake.writes().is_empty());
}

#[tokio::test]
async fn legacy_controller_skips_telemetry_toggles() {
    let fake = FakeController::new(LEGACY);
    fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();
    let input = r"
config:
  network_management_details:
    - site_name: Global/HQ
      settings:
        wired_data_collection: true
";

    let report = Driver::new(&fake, &cipher).run(doc(input)).await;

    assert!(report.fatal().is_none());
    assert!(!report.changed());
    assert!(fake.writes().is_empty());
}

#[tokio::test]
async fn missing_site_fails_without_halting() {
    let fake = FakeController::new(CURRENT);
    fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();
    let input = r"
config:
  network_management_details:
    - site_name: Global/Nowhere
      settings:
        timezone: GMT
    - site_name: Global/HQ
      settings:
        timezone: GMT
";

    let report = Driver::new(&fake, &cipher).run(doc(input)).await;

    assert!(report.fatal().is_none());
    let summary = report.group(Group::NetworkSettings).unwrap();
    assert_eq!(summary.failed[0].name, "Global/Nowhere");
    assert_eq!(summary.updated, vec!["Global/HQ"]);
}

#[tokio::test]
async fn omitted_site_means_global() {
    let fake = FakeController::new(CURRENT);
    let cipher = SessionCipher::new();
    let input = r"
config:
  network_management_details:
    - settings:
        timezone: GMT
";

    let report = Driver::new(&fake, &cipher).run(doc(input)).await;

    assert_eq!(
        report.group(Group::NetworkSettings).unwrap().updated,
        vec!["Global"]
    );
    let global = netconv_core::ids::SiteId::new("site-global");
    assert_eq!(
        fake.aspects(&global).timezone.identifier.as_deref(),
        Some("GMT")
    );
}

#[tokio::test]
async fn deleted_state_leaves_settings_alone() {
    let fake = FakeController::new(CURRENT);
    fake.add_site("site-hq", "Global/HQ", Some("area"));
    let cipher = SessionCipher::new();
    let input = format!("state: deleted\n{HQ_SERVICES}");

    let report = Driver::new(&fake, &cipher).run(doc(&input)).await;

    assert!(report.fatal().is_none());
    assert!(!report.changed());
    assert!(fake.calls().is_empty());
    assert_eq!(
        report.group(Group::NetworkSettings).unwrap().unchanged,
        vec!["Global/HQ"]
    );
}
