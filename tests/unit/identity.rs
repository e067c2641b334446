//! Unit tests for device identity verification

use crate::common::mock_interface::{MockError, REG_PRODUCT_ID};
use crate::common::{create_mock_driver, Operation};
use mmc5983ma::{Error, PRODUCT_ID_VALUE};

#[test]
fn test_init_accepts_product_id() {
    let (mut driver, _interface) = create_mock_driver();
    assert!(driver.init().is_ok(), "Init should succeed with 0x30");
}

#[test]
fn test_init_rejects_wrong_product_id() {
    for actual in [0x00, 0xFF, 0x31] {
        let (mut driver, interface) = create_mock_driver();
        interface.set_product_id(actual);

        match driver.init() {
            Err(Error::IdentityMismatch {
                expected,
                actual: read,
            }) => {
                assert_eq!(expected, PRODUCT_ID_VALUE);
                assert_eq!(read, actual);
            }
            other => panic!("Expected IdentityMismatch for 0x{:02X}, got {:?}", actual, other),
        }
    }
}

#[test]
fn test_init_is_a_single_read() {
    let (mut driver, interface) = create_mock_driver();
    driver.init().unwrap();

    assert_eq!(
        interface.operations(),
        vec![Operation::ReadRegister {
            address: REG_PRODUCT_ID,
            data: vec![0x30],
        }]
    );
}

#[test]
fn test_init_does_not_retry_on_mismatch() {
    let (mut driver, interface) = create_mock_driver();
    interface.set_product_id(0x00);

    assert!(driver.init().is_err());
    assert_eq!(interface.read_count(REG_PRODUCT_ID), 1);
}

#[test]
fn test_init_bus_error_propagates() {
    let (mut driver, interface) = create_mock_driver();
    interface.fail_next_read();

    assert!(matches!(
        driver.init(),
        Err(Error::Bus(MockError::Communication))
    ));
}

#[test]
fn test_read_product_id() {
    let (mut driver, interface) = create_mock_driver();
    interface.set_product_id(0x42);
    assert_eq!(driver.read_product_id().unwrap(), 0x42);
}
