use crate::adapter::{Adapter, Status};
use crate::tests::mock::{MockTimer, MockTransport, SimTimer};
use crate::wifi::{AddressErrors, AssociationState, JoinError, LocalAddress, WifiAdapter};
use core::net::Ipv4Addr;
use fugit::TimerInstantU32;
use mockall::predicate::eq;

type AdapterType = Adapter<MockTransport, SimTimer, 1_000, 256>;

fn adapter(transport: MockTransport) -> AdapterType {
    let timer = SimTimer::new(transport.clock());
    Adapter::new(transport, timer)
}

#[test]
fn test_join_initial_state() {
    let adapter = adapter(MockTransport::new());
    assert_eq!(AssociationState::Reset, adapter.get_join_state());
}

#[test]
fn test_join_correct_commands() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();

    let mut adapter = adapter(transport);
    adapter.join("test_wifi", "secret").unwrap();

    assert_eq!(AssociationState::Connected, adapter.get_join_state());
    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(4, commands.len());
    assert_eq!("AT+RST\r\n".to_string(), commands[0]);
    assert_eq!("AT\r\n".to_string(), commands[1]);
    assert_eq!("AT+CWMODE=1\r\n".to_string(), commands[2]);
    assert_eq!("AT+CWJAP=\"test_wifi\",\"secret\"\r\n".to_string(), commands[3]);
}

#[test]
fn test_join_settle_delay_after_restart() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();
    let clock = transport.clock();

    let mut adapter = adapter(transport);
    adapter.join("test_wifi", "secret").unwrap();

    // Restart, settle delay, probe, station mode, connect, IP assignment
    assert_eq!(vec![5_000, 1_000, 1_000, 1_000, 20_000, 10_000], adapter.timer.started_ms);
    assert_eq!(1_000, clock.now_ms());
}

#[test]
fn test_join_custom_settle_delay() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();

    let mut adapter = adapter(transport);
    adapter.set_settle_delay_ms(250);
    adapter.join("test_wifi", "secret").unwrap();

    assert_eq!(250, adapter.timer.started_ms[1]);
}

#[test]
fn test_join_ip_in_same_read() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nready\r\n");
    transport.add_ok_response();
    transport.add_ok_response();
    transport.add_response(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
    let clock = transport.clock();

    let mut adapter = adapter(transport);
    adapter.join("test_wifi", "secret").unwrap();

    assert_eq!(AssociationState::Connected, adapter.get_join_state());
    // Just the settle delay elapsed, nothing timed out
    assert_eq!(1_000, clock.now_ms());
}

#[test]
fn test_join_restart_timeout() {
    let mut transport = MockTransport::new();
    transport.add_no_response();
    let clock = transport.clock();

    let mut adapter = adapter(transport);
    let result = adapter.join("test_wifi", "secret").unwrap_err();

    assert_eq!(JoinError::RestartError(Status::Timeout), result);
    assert_eq!(AssociationState::Error, adapter.get_join_state());
    assert_eq!(5_000, clock.now_ms());
    assert_eq!(1, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_join_probe_error() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nready\r\n");
    transport.add_error_response();

    let mut adapter = adapter(transport);
    let result = adapter.join("test_wifi", "secret").unwrap_err();

    assert_eq!(JoinError::ProbeError(Status::Error), result);
    assert_eq!(2, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_join_mode_error() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nready\r\n");
    transport.add_ok_response();
    transport.add_error_response();
    transport.add_response(b"WIFI CONNECTED\r\n");
    transport.add_urc(b"WIFI GOT IP\r\n");

    let mut adapter = adapter(transport);
    let result = adapter.join("test_wifi", "secret").unwrap_err();

    assert_eq!(JoinError::ModeError(Status::Error), result);
    assert_eq!(AssociationState::Error, adapter.get_join_state());

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(3, commands.len());
    assert_eq!("AT+CWMODE=1\r\n".to_string(), commands[2]);
}

#[test]
fn test_join_connect_timeout() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nready\r\n");
    transport.add_ok_response();
    transport.add_ok_response();
    transport.add_no_response();
    let clock = transport.clock();

    let mut adapter = adapter(transport);
    let result = adapter.join("test_wifi", "secret").unwrap_err();

    assert_eq!(JoinError::ConnectError(Status::Timeout), result);
    assert_eq!(1_000 + 20_000, clock.now_ms());
}

#[test]
fn test_join_connect_error() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nready\r\n");
    transport.add_ok_response();
    transport.add_ok_response();
    transport.add_response(b"+CWJAP:1\r\n\r\nFAIL\r\n\r\nERROR\r\n");

    let mut adapter = adapter(transport);
    let result = adapter.join("test_wifi", "secret").unwrap_err();

    assert_eq!(JoinError::ConnectError(Status::Error), result);
}

#[test]
fn test_join_no_ip_assigned() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nready\r\n");
    transport.add_ok_response();
    transport.add_ok_response();
    transport.add_response(b"WIFI CONNECTED\r\n");
    let clock = transport.clock();

    let mut adapter = adapter(transport);
    let result = adapter.join("test_wifi", "secret").unwrap_err();

    assert_eq!(JoinError::AddressError(Status::Timeout), result);
    assert_eq!(AssociationState::Error, adapter.get_join_state());
    assert_eq!(1_000 + 10_000, clock.now_ms());
}

#[test]
fn test_join_restarts_after_error() {
    let mut transport = MockTransport::new();
    transport.add_error_response();
    transport.add_join_responses();

    let mut adapter = adapter(transport);
    adapter.join("test_wifi", "secret").unwrap_err();
    assert_eq!(AssociationState::Error, adapter.get_join_state());

    adapter.join("test_wifi", "secret").unwrap();
    assert_eq!(AssociationState::Connected, adapter.get_join_state());

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(5, commands.len());
    assert_eq!("AT+RST\r\n".to_string(), commands[0]);
    assert_eq!("AT+RST\r\n".to_string(), commands[1]);
}

#[test]
fn test_join_invalid_ssid_length() {
    let mut adapter = adapter(MockTransport::new());

    let result = adapter.join("0123456789abcdef0123456789abcdefX", "secret").unwrap_err();
    assert_eq!(JoinError::InvalidSSDLength, result);

    let result = adapter.join("", "secret").unwrap_err();
    assert_eq!(JoinError::InvalidSSDLength, result);

    assert!(adapter.transport.get_commands_as_strings().is_empty());
    assert_eq!(AssociationState::Error, adapter.get_join_state());
}

#[test]
fn test_join_invalid_credentials_after_success() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();

    let mut adapter = adapter(transport);
    adapter.join("test_wifi", "secret").unwrap();
    assert_eq!(AssociationState::Connected, adapter.get_join_state());

    let result = adapter.join("", "secret").unwrap_err();
    assert_eq!(JoinError::InvalidSSDLength, result);
    assert_eq!(AssociationState::Error, adapter.get_join_state());
    assert_eq!(4, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_join_invalid_password_length() {
    let mut adapter = adapter(MockTransport::new());

    let password = "x".repeat(64);
    let result = adapter.join("test_wifi", &password).unwrap_err();
    assert_eq!(JoinError::InvalidPasswordLength, result);
    assert!(adapter.transport.get_commands_as_strings().is_empty());
}

#[test]
fn test_join_max_credential_length() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();

    let ssid = "s".repeat(32);
    let password = "p".repeat(63);
    let mut adapter = adapter(transport);
    adapter.join(&ssid, &password).unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(format!("AT+CWJAP=\"{}\",\"{}\"\r\n", ssid, password), commands[3]);
}

#[test]
fn test_join_special_characters_escaped() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();

    let mut adapter = adapter(transport);
    adapter.join("my \"wifi\",1", "pa\\ss").unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!("AT+CWJAP=\"my \\\"wifi\\\"\\,1\",\"pa\\\\ss\"\r\n".to_string(), commands[3]);
}

#[test]
fn test_join_control_character_rejected() {
    let mut adapter = adapter(MockTransport::new());

    let result = adapter.join("test_wifi", "sec\r\nret").unwrap_err();
    assert_eq!(JoinError::InvalidCharacter, result);
    assert!(adapter.transport.get_commands_as_strings().is_empty());
}

#[test]
fn test_join_settle_delay_started_on_timer() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();

    let mut timer = MockTimer::new();
    timer.expect_now().returning(|| TimerInstantU32::from_ticks(0));
    timer
        .expect_start()
        .with(eq(MockTimer::duration_ms(750)))
        .times(1)
        .returning(|_| Ok(()));
    timer
        .expect_start()
        .withf(|duration| *duration != MockTimer::duration_ms(750))
        .returning(|_| Ok(()));
    timer.expect_wait().times(1).returning(|| Ok(()));

    let mut adapter: Adapter<MockTransport, MockTimer, 1_000_000, 256> = Adapter::new(transport, timer);
    adapter.set_settle_delay_ms(750);
    adapter.join("test_wifi", "secret").unwrap();
    assert_eq!(AssociationState::Connected, adapter.get_join_state());
}

#[test]
fn test_join_timer_error() {
    let mut transport = MockTransport::new();
    transport.add_join_responses();

    let mut timer = MockTimer::new();
    timer.expect_now().returning(|| TimerInstantU32::from_ticks(0));
    timer
        .expect_start()
        .with(eq(MockTimer::duration_ms(750)))
        .times(1)
        .returning(|_| Err(1));
    timer
        .expect_start()
        .withf(|duration| *duration != MockTimer::duration_ms(750))
        .returning(|_| Ok(()));

    let mut adapter: Adapter<MockTransport, MockTimer, 1_000_000, 256> = Adapter::new(transport, timer);
    adapter.set_settle_delay_ms(750);
    let result = adapter.join("test_wifi", "secret").unwrap_err();

    assert_eq!(JoinError::TimerError, result);
    assert_eq!(AssociationState::Error, adapter.get_join_state());
    assert_eq!(1, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_get_address_correct_response() {
    let mut transport = MockTransport::new();
    transport.add_response(b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let address = adapter.get_address().unwrap();

    assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 181)), address.ipv4);
    assert_eq!("10:fe:ed:05:ba:50", address.mac.unwrap().as_str());
    assert_eq!(vec!["AT+CIFSR\r\n".to_string()], adapter.transport.get_commands_as_strings());
}

#[test]
fn test_get_address_split_response() {
    let mut transport = MockTransport::new();
    transport.add_response(b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n\r\nOK\r\n");
    transport.set_read_size(5);

    let mut adapter = adapter(transport);
    let address = adapter.get_address().unwrap();

    assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 181)), address.ipv4);
    assert!(address.mac.is_some());
}

#[test]
fn test_get_address_command_error() {
    let mut transport = MockTransport::new();
    transport.add_error_response();

    let mut adapter = adapter(transport);
    let result = adapter.get_address().unwrap_err();
    assert_eq!(AddressErrors::CommandError(Status::Error), result);
}

#[test]
fn test_get_address_invalid_ip() {
    let mut transport = MockTransport::new();
    transport.add_response(b"+CIFSR:STAIP,\"10.0.0.256\"\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let result = adapter.get_address().unwrap_err();
    assert_eq!(AddressErrors::AddressParseError, result);
}

#[test]
fn test_local_address_missing_entries() {
    let address = LocalAddress::from_response("+CIFSR:STAIP,\"0.0.0.0\"\r\n\r\nOK").unwrap();
    assert_eq!(Some(Ipv4Addr::new(0, 0, 0, 0)), address.ipv4);
    assert!(address.mac.is_none());

    let address = LocalAddress::from_response("\r\nOK").unwrap();
    assert!(address.ipv4.is_none());
    assert!(address.mac.is_none());
}

#[test]
fn test_local_address_too_long_mac() {
    let result = LocalAddress::from_response("+CIFSR:STAMAC,\"10:fe:ed:05:ba:50:ff\"\r\n\r\nOK").unwrap_err();
    assert_eq!(AddressErrors::AddressParseError, result);
}
