// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::{load_state, write_doc},
    ErrorKind, InterfaceDiff, RouteTable, State, SystemRoute, SystemState,
};

fn state_of(content: &str) -> (tempfile::TempDir, State) {
    let tmp = tempfile::TempDir::new().unwrap();
    write_doc(tmp.path(), "etc/netplan", "01-test.yaml", content);
    let state = load_state(tmp.path());
    (tmp, state)
}

fn diff_of(content: &str, system: &str) -> crate::StateDiff {
    let (_tmp, state) = state_of(content);
    state.diff(&SystemState::new(system).unwrap())
}

fn eth0_diff(content: &str, system: &str) -> InterfaceDiff {
    diff_of(content, system)
        .interfaces
        .remove("eth0")
        .unwrap_or_default()
}

#[test]
fn test_system_state_from_json_and_yaml() {
    let yaml = SystemState::new(
        r#"
        netplan-global-state:
          online: true
        eth0:
          index: 2
          id: eth0
          type: ethernet
          addresses:
          - 10.0.0.2:
              prefix: 24
              flags: [dhcp]
        "#,
    )
    .unwrap();
    let json = SystemState::new(
        r#"{"netplan-global-state": {}, "eth0": {"index": 2, "id": "eth0",
        "type": "ethernet", "addresses": [{"10.0.0.2": {"prefix": 24,
        "flags": ["dhcp"]}}]}}"#,
    )
    .unwrap();

    assert_eq!(yaml, json);
    assert_eq!(yaml.interfaces.len(), 1);
    let eth0 = &yaml.interfaces["eth0"];
    assert_eq!(eth0.kind.as_deref(), Some("ethernet"));
    assert_eq!(eth0.addresses[0]["10.0.0.2"].prefix, 24);
    assert!(SystemState::new("").unwrap().interfaces.is_empty());
    assert_eq!(
        SystemState::new("[eth0]").map_err(|e| e.kind()),
        Err(ErrorKind::InvalidArgument)
    );
}

#[test]
fn test_address_missing_from_system() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              dhcp4: false
              addresses:
              - 192.168.0.2/24
              - 192.168.0.1/24
        "#,
        "eth0: {id: eth0}",
    );

    assert_eq!(
        diff.system_state.missing_addresses,
        vec!["192.168.0.1/24", "192.168.0.2/24"]
    );
    assert!(diff.netplan_state.is_empty());
}

#[test]
fn test_dhcp_addresses_not_reported() {
    let diff = diff_of(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              dhcp4: true
              dhcp6: true
        "#,
        r#"
        eth0:
          id: eth0
          addresses:
          - 192.168.0.1: {prefix: 24, flags: [dhcp]}
          - 192.168.254.1: {prefix: 24, flags: [dhcp]}
          - abcd:1234::1: {prefix: 64, flags: [dhcp]}
        "#,
    );

    assert!(diff.is_empty());
}

#[test]
fn test_address_missing_from_definition() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              addresses: ["2001:db8:0::1/64"]
        "#,
        r#"
        eth0:
          id: eth0
          addresses:
          - 2001:db8::1: {prefix: 64}
          - 192.168.0.1: {prefix: 24}
          - 172.16.0.1: {prefix: 16, flags: [dhcp]}
          - fe80::1: {prefix: 64, flags: [link]}
        "#,
    );

    assert!(diff.system_state.is_empty());
    assert_eq!(
        diff.netplan_state.missing_addresses,
        vec!["192.168.0.1/24", "172.16.0.1/16"]
    );
}

#[test]
fn test_dhcp_address_missing_from_system() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              dhcp4: true
              dhcp6: true
        "#,
        r#"
        eth0:
          id: eth0
          addresses:
          - 10.0.0.2: {prefix: 8}
        "#,
    );

    assert!(diff.system_state.missing_dhcp4_address);
    assert!(diff.system_state.missing_dhcp6_address);
    assert_eq!(diff.netplan_state.missing_addresses, vec!["10.0.0.2/8"]);
}

#[test]
fn test_missing_interfaces() {
    let diff = diff_of(
        r#"
        network:
          version: 2
          ethernets:
            eth0: {}
            eth1: {}
            lan:
              match:
                macaddress: "00:11:22:33:44:55"
          wifis:
            wlan0:
              access-points:
                home: {}
        "#,
        r#"
        lo: {type: loopback}
        eth0: {id: eth0}
        eth9: {type: ethernet}
        enp3s0: {id: lan}
        eth7: {id: gone}
        "#,
    );

    assert_eq!(diff.missing_interfaces_system, vec!["eth1"]);
    assert_eq!(diff.missing_interfaces_netplan, vec!["eth7", "eth9"]);
    assert!(diff.interfaces.is_empty());
}

#[test]
fn test_nameservers() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              nameservers:
                addresses: [1.1.1.1, 8.8.8.8]
                search: [example.com]
        "#,
        r#"
        eth0:
          id: eth0
          dns_addresses: [8.8.8.8, 9.9.9.9]
          dns_search: [lab.example.com]
        "#,
    );

    assert_eq!(diff.system_state.missing_nameservers, vec!["1.1.1.1"]);
    assert_eq!(diff.system_state.missing_search_domains, vec!["example.com"]);
    assert_eq!(diff.netplan_state.missing_nameservers, vec!["9.9.9.9"]);
    assert_eq!(
        diff.netplan_state.missing_search_domains,
        vec!["lab.example.com"]
    );
}

const SYSTEM_ROUTES: &str = r#"
eth0:
  id: eth0
  addresses:
  - fd42:bc43:e20e:8cf7:216:3eff:feaf:4121: {prefix: 64}
  routes:
  - to: default
    via: 192.168.5.1
    from: 192.168.5.122
    metric: 100
    type: unicast
    scope: global
    protocol: kernel
    family: 2
    table: main
  - to: 192.168.5.0
    via: 192.168.5.1
    from: 192.168.5.122
    type: unicast
    scope: link
    protocol: kernel
    family: 2
    table: main
  - to: 1.2.3.0/24
    via: 192.168.5.1
    type: unicast
    scope: global
    protocol: dhcp
    family: 2
    table: main
  - to: abcd::/64
    via: abcd::1
    type: unicast
    scope: global
    protocol: ra
    family: 10
    table: main
  - to: fe80::/64
    protocol: kernel
    family: 10
    table: main
  - to: ff00::/8
    type: multicast
    table: local
    protocol: kernel
    family: 10
  - to: 10.86.126.148
    from: 10.86.126.148
    type: local
    scope: host
    table: local
    protocol: kernel
    family: 2
"#;

fn route_destinations(routes: &[SystemRoute]) -> Vec<&str> {
    routes.iter().filter_map(|r| r.to.as_deref()).collect()
}

#[test]
fn test_routes_missing_from_definition() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0: {}
        "#,
        SYSTEM_ROUTES,
    );

    let missing = &diff.netplan_state.missing_routes;
    assert_eq!(
        route_destinations(missing),
        vec!["default", "1.2.3.0/24", "abcd::/64"]
    );
    assert_eq!(missing[0].from.as_deref(), Some("192.168.5.122"));
    assert_eq!(missing[0].metric, Some(100));
    assert_eq!(missing[0].table.as_ref().map(RouteTable::number), Some(254));

    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              dhcp4: true
              dhcp6: true
        "#,
        SYSTEM_ROUTES,
    );

    assert_eq!(
        route_destinations(&diff.netplan_state.missing_routes),
        vec!["default"]
    );
}

#[test]
fn test_routes_missing_from_system() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              routes:
              - to: 1.2.3.0/24
                via: 192.168.0.1
              - to: 10.0.0.0/8
                via: 192.168.0.1
                metric: 300
              - to: 10.1.0.0/16
                via: 192.168.0.1
                table: 1000
        "#,
        r#"
        eth0:
          id: eth0
          routes:
          - to: default
            via: 192.168.5.1
            type: unicast
            scope: global
            protocol: kernel
            family: 2
            table: main
          - to: 10.0.0.0/8
            via: 192.168.0.1
            metric: 100
            protocol: static
            family: 2
            table: main
          - to: 10.1.0.0/16
            via: 192.168.0.1
            protocol: static
            family: 2
            table: "1000"
        "#,
    );

    let mut expected = SystemRoute {
        to: Some("1.2.3.0/24".to_string()),
        via: Some("192.168.0.1".to_string()),
        family: Some(2),
        table: Some(RouteTable::Number(254)),
        ..Default::default()
    };
    let missing = &diff.system_state.missing_routes;
    assert_eq!(missing.len(), 2);
    assert_eq!(missing[0], expected);
    expected.to = Some("10.0.0.0/8".to_string());
    expected.metric = Some(300);
    assert_eq!(missing[1], expected);
    assert_eq!(
        route_destinations(&diff.netplan_state.missing_routes),
        vec!["default", "10.0.0.0/8"]
    );
}

#[test]
fn test_gateway_matches_default_route() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              addresses: [192.168.5.122/24]
              gateway4: 192.168.5.1
        "#,
        r#"
        eth0:
          id: eth0
          addresses:
          - 192.168.5.122: {prefix: 24}
          routes:
          - to: 0.0.0.0/0
            via: 192.168.5.1
            metric: 100
            protocol: static
            family: 2
        "#,
    );

    assert!(diff.system_state.is_empty());
    assert!(diff.netplan_state.is_empty());
}

#[test]
fn test_macaddress() {
    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              macaddress: aa:bb:cc:dd:ee:ff
        "#,
        "eth0: {id: eth0, macaddress: '11:22:33:44:55:66'}",
    );

    assert_eq!(
        diff.system_state.missing_macaddress.as_deref(),
        Some("aa:bb:cc:dd:ee:ff")
    );
    assert_eq!(
        diff.netplan_state.missing_macaddress.as_deref(),
        Some("11:22:33:44:55:66")
    );

    let diff = eth0_diff(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              macaddress: aa:bb:cc:dd:ee:ff
        "#,
        "eth0: {id: eth0, macaddress: 'AA:BB:CC:DD:EE:FF'}",
    );
    assert!(diff.system_state.is_empty());
}

#[test]
fn test_route_table_names() {
    let table = |name: &str| RouteTable::Name(name.to_string()).number();

    assert_eq!(table("main"), 254);
    assert_eq!(table("default"), 253);
    assert_eq!(table("local"), 255);
    assert_eq!(table("blah"), 0);
    assert_eq!(table("1000"), 1000);
    assert_eq!(RouteTable::Number(42).number(), 42);
}

#[test]
fn test_diff_serialized_without_empty_sections() {
    let diff = diff_of(
        r#"
        network:
          version: 2
          ethernets:
            eth0:
              macaddress: aa:bb:cc:dd:ee:ff
        "#,
        "eth0: {id: eth0}",
    );

    let value = serde_yaml::to_value(&diff).unwrap();
    let expected: serde_yaml::Value = serde_yaml::from_str(
        r#"
        interfaces:
          eth0:
            id: eth0
            system_state:
              missing_macaddress: aa:bb:cc:dd:ee:ff
        missing_interfaces_system: []
        missing_interfaces_netplan: []
        "#,
    )
    .unwrap();
    assert_eq!(value, expected);
}
