//! Integration tests for acknowledgements

use pipehat::core::ack::{accept_ack, error_ack, APPLICATION_ACCEPT, APPLICATION_ERROR, APPLICATION_REJECT};
use pipehat::core::Parser;
use pretty_assertions::assert_eq;

const ADT_A01: &str = "MSH|^~\\&|SENDER|SFAC|RECEIVER|RFAC|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r";

#[test]
fn test_accept_ack_round_trip() {
    let parser = Parser::with_defaults().unwrap();
    let message = parser.parse(ADT_A01).unwrap();

    let ack = accept_ack(&message, parser.context()).unwrap();
    let text = parser.encode(&ack).unwrap();
    let reply = parser.parse(&text).unwrap();

    assert_eq!(reply.structure(), "ACK");
    assert_eq!(reply.version().as_str(), "2.4");
    assert_eq!(reply.get("MSA-1").unwrap(), Some(APPLICATION_ACCEPT));
    assert_eq!(reply.get("MSA-2").unwrap(), Some("123"));
    assert_eq!(reply.get("MSH-3").unwrap(), Some("RECEIVER"));
    assert_eq!(reply.get("MSH-5").unwrap(), Some("SENDER"));
    assert_eq!(reply.get("MSH-9-2").unwrap(), Some("A01"));
    assert_ne!(reply.control_id(), Some("123"));
}

#[test]
fn test_error_ack_for_missing_segment() {
    let parser = Parser::with_defaults().unwrap();
    let raw = "MSH|^~\\&|SENDER|SFAC|RECEIVER|RFAC|20240101||ADT^A01|123|P|2.4\r";
    let err = parser.parse(raw).unwrap_err().into_hl7();

    let ack = error_ack(raw, &err, parser.context()).unwrap();
    assert_eq!(ack.get("MSA-1").unwrap(), Some(APPLICATION_ERROR));
    assert_eq!(ack.get("MSA-2").unwrap(), Some("123"));
    assert_eq!(ack.get("MSA-3").unwrap(), Some(err.message()));
    assert_eq!(ack.get("ERR-1-1").unwrap(), Some("PID"));
    assert_eq!(ack.get("ERR-1-4-1").unwrap(), Some("101"));
    assert_eq!(ack.get("ERR-1-4-3").unwrap(), Some("hl70357"));

    let text = parser.encode(&ack).unwrap();
    assert!(text.contains("MSA|AE|123|"));
    assert!(text.contains("\rERR|PID^"));
}

#[test]
fn test_error_ack_rejects_unknown_version() {
    let parser = Parser::with_defaults().unwrap();
    let raw = "MSH|^~\\&|SENDER|SFAC|RECEIVER|RFAC|20240101||ADT^A01|123|T|9.9\rPID|1\r";
    let err = parser.parse(raw).unwrap_err().into_hl7();

    let ack = error_ack(raw, &err, parser.context()).unwrap();
    assert_eq!(ack.get("MSA-1").unwrap(), Some(APPLICATION_REJECT));
    assert_eq!(ack.version().as_str(), "2.5");
    assert_eq!(ack.processing_id(), Some("T"));
    assert_eq!(ack.get("ERR-1-4-1").unwrap(), Some("203"));
}

#[test]
fn test_error_ack_for_garbage() {
    let parser = Parser::with_defaults().unwrap();
    let raw = "not a message";
    let err = parser.parse(raw).unwrap_err().into_hl7();

    let ack = error_ack(raw, &err, parser.context()).unwrap();
    assert_eq!(ack.get("MSA-1").unwrap(), Some(APPLICATION_ERROR));
    assert_eq!(ack.get("MSA-2").unwrap(), None);
    assert_eq!(ack.processing_id(), Some("P"));
    assert!(parser.encode(&ack).is_ok());
}
