// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::{
    keyfile::{
        delete_connection, escape_ssid, id_from_profile_path,
        netdef_from_keyfile, netdef_to_keyfile, netdef_to_keyfiles,
        profile_filename, yaml_filename, yaml_filename_for_id, Keyfile,
    },
    unit_tests::{write_doc, write_file},
    DeviceKind, ErrorKind, NetDef, NmSettings, NplanConf, Parser, Renderer,
    RouteConfig, State,
};

const UUID: &str = "87749f1d-334f-40b2-98d4-55db58965f5f";

const ETH_PROFILE: &str = r#"
[connection]
id=Wired connection 1
type=ethernet
uuid=87749f1d-334f-40b2-98d4-55db58965f5f
interface-name=eth0
permissions=
autoconnect-priority=-999

[ethernet]
mac-address=52:54:00:12:34:56
mtu=9000

[ipv4]
method=manual
address1=192.168.1.10/24,192.168.1.1
address2=10.0.0.10/8
dns=8.8.8.8;1.1.1.1;
dns-search=example.com;
route1=172.16.0.0/12,192.168.1.254,100
route1_options=table=200

[ipv6]
method=auto
addr-gen-mode=stable-privacy
dns=2001:4860:4860::8888;

[proxy]
"#;

const WIFI_PROFILE: &str = r#"
[connection]
id=Home
uuid=ff9d6ebc-226d-4f82-a485-b7ff83b9607f
type=wifi
interface-name=wlan0

[wifi]
mode=infrastructure
ssid=My Home/5G

[wifi-security]
key-mgmt=wpa-psk
psk=s3cr3t!

[ipv4]
method=auto

[ipv6]
method=ignore
"#;

fn import(content: &str) -> NetDef {
    netdef_from_keyfile(&Keyfile::parse(content).unwrap()).unwrap()
}

fn assert_round_trip(content: &str) {
    let netdef = import(content);
    for (_, keyfile) in netdef_to_keyfiles(&netdef).unwrap() {
        let text = keyfile.to_string();
        let again = import(&text);
        assert_eq!(again, netdef, "round trip of\n{content}\nvia\n{text}");
    }
}

#[test]
fn test_ini_parse_and_format() {
    let kf = Keyfile::parse(
        "# comment\n[connection]\nid = eth0\ntype=ethernet\n\n[ipv4]\n\
         method=auto\n",
    )
    .unwrap();

    assert_eq!(kf.get("connection", "id"), Some("eth0"));
    assert_eq!(kf.get("connection", "type"), Some("ethernet"));
    assert_eq!(kf.groups().collect::<Vec<_>>(), vec!["connection", "ipv4"]);
    assert_eq!(
        kf.to_string(),
        "[connection]\nid=eth0\ntype=ethernet\n\n[ipv4]\nmethod=auto\n"
    );
}

#[test]
fn test_import_with_spaces_around_equal_sign() {
    let netdef = import(
        "[connection]\n\
         type = ethernet\n\
         interface-name = eth0\n\
         \n\
         [ipv4]\n\
         method = auto \n",
    );

    assert_eq!(netdef.id, "eth0");
    assert_eq!(netdef.kind, DeviceKind::Ethernet);
    assert_eq!(netdef.dhcp4, Some(true));
    assert_eq!(
        netdef.match_conf.and_then(|m| m.name).as_deref(),
        Some("eth0")
    );
}

#[test]
fn test_ini_key_before_group() {
    let result = Keyfile::parse("id=eth0\n[connection]\n");

    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::SyntaxError));
}

#[test]
fn test_import_ethernet() {
    let netdef = import(ETH_PROFILE);

    assert_eq!(netdef.id, format!("NM-{UUID}"));
    assert_eq!(netdef.kind, DeviceKind::Ethernet);
    assert_eq!(netdef.renderer, Some(Renderer::NetworkManager));
    assert_eq!(netdef.uuid(), Some(UUID));
    assert_eq!(netdef.nm_name(), Some("Wired connection 1"));
    let match_conf = netdef.match_conf.as_ref().unwrap();
    assert_eq!(match_conf.name.as_deref(), Some("eth0"));
    assert_eq!(match_conf.macaddress.as_deref(), Some("52:54:00:12:34:56"));
    assert_eq!(netdef.mtu, Some(9000));
    assert_eq!(netdef.dhcp4, None);
    assert_eq!(netdef.dhcp6, Some(true));
    assert_eq!(
        netdef.addresses,
        vec!["192.168.1.10/24".to_string(), "10.0.0.10/8".to_string()]
    );
    assert_eq!(netdef.gateway4.as_deref(), Some("192.168.1.1"));
    let mut route = RouteConfig::new("172.16.0.0/12", Some("192.168.1.254"));
    route.metric = Some(100);
    route.table = Some(200);
    assert_eq!(netdef.routes, vec![route]);
    let ns = netdef.nameservers.as_ref().unwrap();
    assert_eq!(
        ns.addresses,
        vec![
            "8.8.8.8".to_string(),
            "1.1.1.1".to_string(),
            "2001:4860:4860::8888".to_string()
        ]
    );
    assert_eq!(ns.search, vec!["example.com".to_string()]);

    assert_eq!(netdef.passthrough_get("connection", "permissions"), Some(""));
    assert_eq!(
        netdef.passthrough_get("connection", "autoconnect-priority"),
        Some("-999")
    );
    assert_eq!(
        netdef.passthrough_get("ipv6", "addr-gen-mode"),
        Some("stable-privacy")
    );
    assert_eq!(netdef.passthrough_get("connection", "uuid"), None);
    let nm = netdef.networkmanager.as_ref().unwrap();
    assert!(nm.passthrough.get("proxy").unwrap().is_empty());
    assert!(!nm.passthrough.contains_key("ethernet"));
}

#[test]
fn test_import_wifi() {
    let netdef = import(WIFI_PROFILE);

    assert_eq!(netdef.kind, DeviceKind::Wifi);
    assert_eq!(netdef.dhcp4, Some(true));
    let ap = netdef.access_points.get("My Home/5G").unwrap();
    assert_eq!(ap.password.as_deref(), Some("s3cr3t!"));
    assert_eq!(ap.mode.as_deref(), Some("infrastructure"));
    assert_eq!(netdef.passthrough_get("ipv6", "method"), Some("ignore"));
    assert_eq!(netdef.passthrough_get("wifi-security", "key-mgmt"), None);
}

#[test]
fn test_import_without_uuid_uses_interface_name() {
    let netdef = import(
        r#"
[connection]
type=vlan
interface-name=eth0.10

[vlan]
id=10
parent=eth0
"#,
    );

    assert_eq!(netdef.id, "eth0.10");
    assert_eq!(netdef.kind, DeviceKind::Vlan);
    assert_eq!(netdef.vlan_id, Some(10));
    assert_eq!(netdef.link.as_deref(), Some("eth0"));
    assert!(netdef.match_conf.is_none());
}

#[test]
fn test_import_unknown_type_keeps_type_in_passthrough() {
    let netdef = import(
        r#"
[connection]
type=dummy
uuid=b3a2e5c8-2f4a-4a43-9d2a-cf2b6c64d5a1
interface-name=dummy0
"#,
    );

    assert_eq!(netdef.kind, DeviceKind::NmDevice);
    assert_eq!(netdef.passthrough_get("connection", "type"), Some("dummy"));
    assert_eq!(
        netdef.passthrough_get("connection", "interface-name"),
        Some("dummy0")
    );
}

#[test]
fn test_import_invalid_uuid() {
    let kf = Keyfile::parse("[connection]\ntype=ethernet\nuuid=abc-123\n")
        .unwrap();

    let result = netdef_from_keyfile(&kf);

    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::ConstraintError));
}

#[test]
fn test_import_without_identifier() {
    let kf = Keyfile::parse("[connection]\ntype=ethernet\n").unwrap();

    let result = netdef_from_keyfile(&kf);

    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::InvalidArgument));
}

#[test]
fn test_round_trip() {
    assert_round_trip(ETH_PROFILE);
    assert_round_trip(WIFI_PROFILE);
    assert_round_trip(
        r#"
[connection]
id=bond0 port
uuid=0c4b1bd4-1d5f-45a0-9d2c-7a2fa7a2c0f1
type=ethernet
interface-name=eth1
master=bond0
slave-type=bond

[ipv4]
method=disabled
"#,
    );
    assert_round_trip(
        r#"
[connection]
id=wg
uuid=3c4b1bd4-1d5f-45a0-9d2c-7a2fa7a2c0f2
type=wireguard
interface-name=wg0

[wireguard]
private-key=aPUcp5vHz8yMLrzk8SsDyYnV33IhE/k20e52iKJFV0A=
listen-port=51820

[wireguard-peer.cwkb7k0xDgLSnunZpFIjLJw4u+mJDDr+aBR5DqzpmgI=]
endpoint=1.2.3.4:12345
allowed-ips=0.0.0.0/0;
"#,
    );
    assert_round_trip(
        r#"
[connection]
id=gre1
type=ip-tunnel
interface-name=gre1

[ip-tunnel]
mode=2
local=10.0.0.1
remote=10.0.0.2

[ipv6]
method=manual
address1=2001:db8::1/64
gateway=2001:db8::ff
route1=2001:db8:1::/48
"#,
    );
    assert_round_trip(
        r#"
[connection]
type=dummy
uuid=b3a2e5c8-2f4a-4a43-9d2a-cf2b6c64d5a1
interface-name=dummy0

[dummy]
"#,
    );
}

#[test]
fn test_export_wifi_one_profile_per_access_point() {
    let mut netdef: NetDef = import(WIFI_PROFILE);
    netdef
        .access_points
        .insert("Office".to_string(), Default::default());

    let profiles = netdef_to_keyfiles(&netdef).unwrap();

    let names: Vec<&str> = profiles.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "netplan-NM-ff9d6ebc-226d-4f82-a485-b7ff83b9607f-My%20Home%2F5G\
             .nmconnection",
            "netplan-NM-ff9d6ebc-226d-4f82-a485-b7ff83b9607f-Office\
             .nmconnection",
        ]
    );
    assert_eq!(profiles[1].1.get("wifi", "ssid"), Some("Office"));
    assert_eq!(profiles[1].1.get("wifi-security", "psk"), None);
}

#[test]
fn test_export_passthrough_wins() {
    let mut netdef = NetDef::new("eth0", DeviceKind::Ethernet);
    netdef.dhcp4 = Some(true);
    let mut nm = NmSettings::default();
    nm.passthrough_set("ipv4", "method", "link-local");
    netdef.networkmanager = Some(nm);

    let kf = netdef_to_keyfile(&netdef, None).unwrap();

    assert_eq!(kf.get("ipv4", "method"), Some("link-local"));
    assert_eq!(kf.get("connection", "type"), Some("ethernet"));
}

#[test]
fn test_yaml_filename_naming() {
    let mut netdef = NetDef::new("eth0", DeviceKind::Ethernet);
    assert_eq!(yaml_filename(&netdef), "10-netplan-eth0.yaml");

    netdef.nm_mut().uuid = Some("abc-123".to_string());
    assert_eq!(yaml_filename(&netdef), "90-NM-abc-123.yaml");

    assert_eq!(
        yaml_filename_for_id(&format!("NM-{UUID}")),
        format!("90-NM-{UUID}.yaml")
    );
    assert_eq!(yaml_filename_for_id("eth0"), "10-netplan-eth0.yaml");
    assert_eq!(yaml_filename_for_id("NM-foo"), "10-netplan-NM-foo.yaml");
}

#[test]
fn test_imported_filename_matches_yaml_filename_for_id() {
    let netdef = import(ETH_PROFILE);

    assert_eq!(yaml_filename(&netdef), yaml_filename_for_id(&netdef.id));
}

#[test]
fn test_escape_ssid() {
    assert_eq!(escape_ssid("plain-ssid_1.0~"), "plain-ssid_1.0~");
    assert_eq!(escape_ssid("a b/c"), "a%20b%2Fc");
    assert_eq!(escape_ssid("café"), "caf%C3%A9");
}

#[test]
fn test_profile_filename_reverse_derivation() {
    let long_id = "x".repeat(300);
    let cases: [(&str, Option<&str>); 5] = [
        ("eth0", None),
        ("NM-87749f1d-334f-40b2-98d4-55db58965f5f", None),
        ("wlan0", Some("My Home/5G")),
        ("wl-an-0", Some("-dash-ssid-")),
        (long_id.as_str(), Some("a very long ssid with spaces.........")),
    ];
    for (id, ssid) in cases {
        let name = profile_filename(id, ssid);
        let path = Path::new("/run/NetworkManager/system-connections")
            .join(&name);

        assert_eq!(id_from_profile_path(&path, ssid).as_deref(), Some(id));
    }
}

#[test]
fn test_reverse_derivation_of_foreign_profile() {
    let path = Path::new(
        "/etc/NetworkManager/system-connections/Home.nmconnection",
    );
    assert_eq!(id_from_profile_path(path, None), None);

    let path = Path::new("/run/netplan-eth0.nmconnection");
    assert_eq!(id_from_profile_path(path, Some("Home")), None);

    let path = Path::new("/run/netplan-.nmconnection");
    assert_eq!(id_from_profile_path(path, None), None);
}

#[test]
fn test_load_keyfile_backfills_bond_link() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_doc(
        tmp.path(),
        "etc/netplan",
        "01-bond.yaml",
        r#"
        network:
          version: 2
          bonds:
            bond0:
              dhcp4: true
        "#,
    );
    let profile = write_file(
        &tmp.path().join("port.nmconnection"),
        r#"
[connection]
id=port
uuid=0c4b1bd4-1d5f-45a0-9d2c-7a2fa7a2c0f1
type=ethernet
interface-name=eth1
master=bond0
slave-type=bond
"#,
    );
    let mut parser = Parser::new(&NplanConf::new(Some(tmp.path())));
    parser.load_hierarchy().unwrap();

    let imported = parser.load_keyfile(&profile).unwrap();

    assert_eq!(imported.id, "NM-0c4b1bd4-1d5f-45a0-9d2c-7a2fa7a2c0f1");
    assert!(!imported.replaced);
    assert_eq!(
        imported.filename(&parser).as_deref(),
        Some("90-NM-0c4b1bd4-1d5f-45a0-9d2c-7a2fa7a2c0f1.yaml")
    );
    assert_eq!(
        parser.defs().last().map(|n| n.id.as_str()),
        Some(imported.id.as_str())
    );
    let port = parser.defs().get(&imported.id).unwrap();
    assert_eq!(port.bond.as_deref(), Some("bond0"));

    let state = State::new(parser).unwrap();
    let members: Vec<&str> =
        state.members("bond0").iter().map(|n| n.id.as_str()).collect();
    assert_eq!(members, vec![imported.id.as_str()]);
}

#[test]
fn test_load_keyfile_unknown_controller_kept_as_passthrough() {
    let tmp = tempfile::TempDir::new().unwrap();
    let profile = write_file(
        &tmp.path().join("port.nmconnection"),
        r#"
[connection]
uuid=0c4b1bd4-1d5f-45a0-9d2c-7a2fa7a2c0f1
type=ethernet
interface-name=eth1
master=br-missing
slave-type=bridge
"#,
    );
    let mut parser = Parser::new(&NplanConf::new(Some(tmp.path())));
    parser.load_hierarchy().unwrap();

    let imported = parser.load_keyfile(&profile).unwrap();

    let port = parser.defs().get(&imported.id).unwrap();
    assert_eq!(port.bridge, None);
    assert_eq!(
        port.passthrough_get("connection", "master"),
        Some("br-missing")
    );
    assert_eq!(
        port.passthrough_get("connection", "slave-type"),
        Some("bridge")
    );
    assert!(State::new(parser).is_ok());
}

#[test]
fn test_load_keyfile_replaces_existing_definition() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_doc(
        tmp.path(),
        "etc/netplan",
        "01-eth.yaml",
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              dhcp4: true
            eth1:
              dhcp4: true
        "#,
    );
    let profile = write_file(
        &tmp.path().join("eth0.nmconnection"),
        "[connection]\ntype=ethernet\ninterface-name=eth0\n\n\
         [ipv4]\nmethod=manual\naddress1=10.0.0.2/24\n",
    );
    let mut parser = Parser::new(&NplanConf::new(Some(tmp.path())));
    parser.load_hierarchy().unwrap();

    let imported = parser.load_keyfile(&profile).unwrap();

    assert!(imported.replaced);
    assert_eq!(parser.defs().len(), 2);
    let ids: Vec<&str> = parser.defs().ids().collect();
    assert_eq!(ids, vec!["eth1", "eth0"]);
    let eth0 = parser.defs().get("eth0").unwrap();
    assert_eq!(eth0.dhcp4, None);
    assert_eq!(eth0.addresses, vec!["10.0.0.2/24".to_string()]);
    assert!(parser.defs().origins("eth0").is_empty());
}

#[test]
fn test_load_keyfile_missing_file() {
    let mut parser = Parser::default();

    let result = parser.load_keyfile(Path::new("/nonexistent/x.nmconnection"));

    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::IoError));
}

#[test]
fn test_delete_connection() {
    let tmp = tempfile::TempDir::new().unwrap();
    let conf = NplanConf::new(Some(tmp.path()));
    let generated = write_doc(
        tmp.path(),
        "etc/netplan",
        &format!("90-NM-{UUID}.yaml"),
        "network: {version: 2}",
    );
    let unrelated = write_doc(
        tmp.path(),
        "etc/netplan",
        "01-base.yaml",
        "network: {version: 2}",
    );
    let runtime = write_doc(
        tmp.path(),
        "run/netplan",
        &format!("90-NM-{UUID}.yaml"),
        "network: {version: 2}",
    );
    let profile = Path::new("/run/NetworkManager/system-connections")
        .join(profile_filename(&format!("NM-{UUID}"), None));

    assert_eq!(delete_connection(&conf, &profile, None).unwrap(), Some(true));
    assert!(!generated.exists());
    assert!(unrelated.exists());
    assert!(runtime.exists());

    assert_eq!(delete_connection(&conf, &profile, None).unwrap(), Some(false));
}

#[test]
fn test_delete_connection_of_definition_with_uuid() {
    let tmp = tempfile::TempDir::new().unwrap();
    let conf = NplanConf::new(Some(tmp.path()));
    let generated = write_doc(
        tmp.path(),
        "etc/netplan",
        &format!("90-NM-{UUID}.yaml"),
        &format!(
            r#"
            network:
              version: 2
              ethernets:
                eth0:
                  renderer: NetworkManager
                  networkmanager:
                    uuid: {UUID}
            "#
        ),
    );
    let mut parser = Parser::new(&conf);
    parser.load_hierarchy().unwrap();
    let netdef = parser.defs().get("eth0").unwrap();
    assert_eq!(
        generated.file_name().and_then(|n| n.to_str()),
        Some(yaml_filename(netdef).as_str())
    );
    let profile = Path::new("/run/NetworkManager/system-connections")
        .join(netdef_to_keyfiles(netdef).unwrap().remove(0).0);

    let result = delete_connection(&conf, &profile, None);

    assert_eq!(result.unwrap(), Some(true));
    assert!(!generated.exists());
}

#[test]
fn test_delete_connection_not_derivable() {
    let tmp = tempfile::TempDir::new().unwrap();
    let conf = NplanConf::new(Some(tmp.path()));
    let kept = write_doc(
        tmp.path(),
        "etc/netplan",
        "10-netplan-Home.yaml",
        "network: {version: 2}",
    );

    let result = delete_connection(
        &conf,
        Path::new("/etc/NetworkManager/system-connections/Home.nmconnection"),
        None,
    );

    assert_eq!(result.unwrap(), None);
    assert!(kept.exists());
}

#[test]
fn test_delete_wifi_connection_with_ssid() {
    let tmp = tempfile::TempDir::new().unwrap();
    let conf = NplanConf::new(Some(tmp.path()));
    let generated = write_doc(
        tmp.path(),
        "etc/netplan",
        "10-netplan-wlan0.yaml",
        "network: {version: 2}",
    );
    let profile = Path::new("/run/NetworkManager/system-connections")
        .join(profile_filename("wlan0", Some("Guest Net")));

    let result = delete_connection(&conf, &profile, Some("Guest Net"));

    assert_eq!(result.unwrap(), Some(true));
    assert!(!generated.exists());
}
