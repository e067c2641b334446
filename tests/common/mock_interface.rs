//! Mock register interface simulating the MMC5983MA

#[cfg(feature = "async")]
use device_driver::AsyncRegisterInterface;
use device_driver::RegisterInterface;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const REG_TOUT: u8 = 0x07;
pub const REG_STATUS: u8 = 0x08;
pub const REG_CONTROL_0: u8 = 0x09;
pub const REG_CONTROL_1: u8 = 0x0A;
pub const REG_PRODUCT_ID: u8 = 0x2F;

const STATUS_MEAS_M_DONE: u8 = 0x01;
const STATUS_MEAS_T_DONE: u8 = 0x02;
const STATUS_OTP_READ_DONE: u8 = 0x10;

const CTRL0_TM_M: u8 = 0x01;
const CTRL0_TM_T: u8 = 0x02;
const CTRL0_OTP_READ: u8 = 0x40;

/// Internal Control 0-3 cannot be read back on the device
fn is_write_only(address: u8) -> bool {
    (0x09..=0x0C).contains(&address)
}

/// Records operations performed on the mock interface
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// One read transaction
    ReadRegister {
        /// Start address
        address: u8,
        /// Bytes returned
        data: Vec<u8>,
    },
    /// One write transaction
    WriteRegister {
        /// Start address
        address: u8,
        /// Bytes written
        data: Vec<u8>,
    },
}

/// Shared state for mock interface (uses interior mutability)
#[derive(Debug)]
struct MockState {
    /// Simulated register values
    registers: HashMap<u8, u8>,

    /// Operations log for verification
    operations: Vec<Operation>,

    /// Status bit that will be set once the in-flight operation completes
    pending_done: Option<u8>,
    /// Status reads left before the in-flight operation completes
    polls_remaining: u32,
    /// Status reads needed after each trigger (None = never completes)
    done_after: Option<u32>,

    /// Failure injection flags
    fail_next_read: bool,
    fail_next_write: bool,
    fail_read_at: Option<u8>,
}

impl MockState {
    fn new() -> Self {
        let mut state = Self {
            registers: HashMap::new(),
            operations: Vec::new(),
            pending_done: None,
            polls_remaining: 0,
            done_after: Some(1),
            fail_next_read: false,
            fail_next_write: false,
            fail_read_at: None,
        };

        // Product ID = 0x30
        state.registers.insert(REG_PRODUCT_ID, 0x30);

        // Null field on all axes
        state.set_field_bytes([0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00]);

        state
    }

    fn register(&self, address: u8) -> u8 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    fn set_field_bytes(&mut self, bytes: [u8; 7]) {
        for (i, byte) in bytes.into_iter().enumerate() {
            self.registers.insert(i as u8, byte);
        }
    }

    /// Start a self-clearing operation whose completion sets `done_bit`
    fn start(&mut self, done_bit: u8) {
        let status = self.register(REG_STATUS) & !done_bit;
        self.registers.insert(REG_STATUS, status);
        self.pending_done = Some(done_bit);
        self.polls_remaining = self.done_after.unwrap_or(0).max(1);
    }

    /// Advance the in-flight operation by one status read
    fn on_status_read(&mut self) {
        let Some(done_bit) = self.pending_done else {
            return;
        };
        if self.done_after.is_none() {
            return;
        }

        self.polls_remaining = self.polls_remaining.saturating_sub(1);
        if self.polls_remaining == 0 {
            let status = self.register(REG_STATUS) | done_bit;
            self.registers.insert(REG_STATUS, status);
            self.pending_done = None;
        }
    }

    fn on_control_0_write(&mut self, value: u8) {
        if value & CTRL0_TM_M != 0 {
            self.start(STATUS_MEAS_M_DONE);
        } else if value & CTRL0_TM_T != 0 {
            self.start(STATUS_MEAS_T_DONE);
        } else if value & CTRL0_OTP_READ != 0 {
            self.start(STATUS_OTP_READ_DONE);
        }
    }
}

/// Mock interface for testing
#[derive(Clone)]
pub struct MockInterface {
    state: Rc<RefCell<MockState>>,
}

impl MockInterface {
    /// Create a new mock interface with default register values
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::new())),
        }
    }

    /// Set a register value
    pub fn set_register(&self, address: u8, value: u8) {
        self.state.borrow_mut().registers.insert(address, value);
    }

    /// Get a register value
    pub fn get_register(&self, address: u8) -> u8 {
        self.state.borrow().register(address)
    }

    /// Set Product ID register value
    pub fn set_product_id(&self, value: u8) {
        self.set_register(REG_PRODUCT_ID, value);
    }

    /// Set the seven output bytes returned by the next field burst
    pub fn set_field_bytes(&self, bytes: [u8; 7]) {
        self.state.borrow_mut().set_field_bytes(bytes);
    }

    /// Set the raw temperature code
    pub fn set_temperature_raw(&self, raw: u8) {
        self.set_register(REG_TOUT, raw);
    }

    /// Number of status reads after a trigger until the done flag is set
    pub fn set_done_after(&self, polls: u32) {
        self.state.borrow_mut().done_after = Some(polls);
    }

    /// Never set the done flag after a trigger
    pub fn stall_measurements(&self) {
        self.state.borrow_mut().done_after = None;
    }

    /// Inject a read failure on the next read operation
    pub fn fail_next_read(&self) {
        self.state.borrow_mut().fail_next_read = true;
    }

    /// Inject a write failure on the next write operation
    pub fn fail_next_write(&self) {
        self.state.borrow_mut().fail_next_write = true;
    }

    /// Inject a failure on the next read starting at `address`
    pub fn fail_read_at(&self, address: u8) {
        self.state.borrow_mut().fail_read_at = Some(address);
    }

    /// Get the operations log
    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    /// Clear the operations log
    pub fn clear_operations(&self) {
        self.state.borrow_mut().operations.clear();
    }

    /// All values written to `address`, in order
    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::WriteRegister { address: a, data } if *a == address => {
                    Some(data.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Number of reads starting at `address`
    pub fn read_count(&self, address: u8) -> usize {
        self.state
            .borrow()
            .operations
            .iter()
            .filter(|op| matches!(op, Operation::ReadRegister { address: a, .. } if *a == address))
            .count()
    }

    /// Number of write transactions of any kind
    pub fn write_count(&self) -> usize {
        self.state
            .borrow()
            .operations
            .iter()
            .filter(|op| matches!(op, Operation::WriteRegister { .. }))
            .count()
    }
}

/// Mock error type
#[derive(Debug, Clone, PartialEq)]
pub enum MockError {
    /// Simulated communication error
    Communication,
}

impl RegisterInterface for MockInterface {
    type Error = MockError;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();

        // Check for injected failure
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(MockError::Communication);
        }
        if state.fail_read_at == Some(address) {
            state.fail_read_at = None;
            return Err(MockError::Communication);
        }

        if address == REG_STATUS {
            state.on_status_read();
        }

        for (i, byte) in read_data.iter_mut().enumerate() {
            let reg_addr = address.wrapping_add(i as u8);
            *byte = if is_write_only(reg_addr) {
                0
            } else {
                state.register(reg_addr)
            };
        }

        state.operations.push(Operation::ReadRegister {
            address,
            data: read_data.to_vec(),
        });

        Ok(())
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();

        // Check for injected failure
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(MockError::Communication);
        }

        state.operations.push(Operation::WriteRegister {
            address,
            data: write_data.to_vec(),
        });

        for (i, &byte) in write_data.iter().enumerate() {
            let reg_addr = address.wrapping_add(i as u8);
            match reg_addr {
                // Command bits are self-clearing, the register never holds them
                REG_CONTROL_0 => state.on_control_0_write(byte),
                // SW_RST self-clears
                REG_CONTROL_1 => {
                    state.registers.insert(reg_addr, byte & 0x7F);
                }
                _ => {
                    state.registers.insert(reg_addr, byte);
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "async")]
impl AsyncRegisterInterface for MockInterface {
    type Error = MockError;
    type AddressType = u8;

    async fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        // Delegate to synchronous implementation
        RegisterInterface::read_register(self, address, size_bits, read_data)
    }

    async fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        // Delegate to synchronous implementation
        RegisterInterface::write_register(self, address, size_bits, write_data)
    }
}

impl Default for MockInterface {
    fn default() -> Self {
        Self::new()
    }
}
