/// Test doubles: a simulated mailbox CAN controller, a host-side bus wired
/// to the same simulated segment, and a virtual-clock timer.
use embedded_can::StandardId;
use korri_canboot::infra::irq::InterruptControl;
use korri_canboot::protocol::packet;
use korri_canboot::protocol::transport::{
    can_frame::{CanFrame, RxFrame},
    traits::{
        bus_timer::BusTimer,
        can_bus::CanBus,
        can_peripheral::{BusErrorState, CanPeripheral, MailboxKind},
    },
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tokio::task::yield_now;

#[allow(dead_code)]
pub fn sid(raw: u16) -> StandardId {
    StandardId::new(raw).unwrap()
}

#[allow(dead_code)]
/// Stand-in checksum: two's complement of the byte sum.
pub fn sum_checksum(bytes: &[u8]) -> u16 {
    let sum = bytes.iter().fold(0u16, |acc, b| acc.wrapping_add(*b as u16));
    (!sum).wrapping_add(1)
}

#[allow(dead_code)]
/// Encode a packet with the stand-in checksum.
pub fn frame_packet(code: u8, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; packet::framed_len(data.len())];
    let len = packet::encode(&mut out, code, data, sum_checksum).unwrap();
    out.truncate(len);
    out
}

//==================================================================================SIM_STATE
#[derive(Debug, Default, Clone)]
pub struct TxSlot {
    pub frame: Option<CanFrame>,
    pub armed_len: usize,
    /// Polls of `tx_is_full` left before the frame leaves.
    pub pending: Option<u32>,
}

#[derive(Debug)]
#[allow(dead_code)]
/// Everything the simulated segment and controller know.
pub struct SimState {
    pub start_count: u32,
    pub stop_count: u32,
    pub abort_count: u32,

    pub rx: Vec<Option<RxFrame>>,
    /// Next mailbox the controller fills (hardware round-robin).
    pub fill_next: usize,
    /// Frames on the wire waiting for a free mailbox.
    pub backlog: VecDeque<RxFrame>,
    /// Frame re-inserted in a mailbox every time it is released.
    pub refill: Vec<Option<RxFrame>>,
    pub released: Vec<usize>,

    pub tx_kinds: Vec<MailboxKind>,
    pub tx: Vec<TxSlot>,
    /// Polls of `tx_is_full` a triggered frame stays pending.
    pub tx_latency: u32,
    pub loads: u32,
    pub triggers: u32,
    /// Bump the TX error counter on the n-th trigger (1-based).
    pub tec_bump_at_trigger: Option<u32>,
    pub tec: u8,
    pub cancelled: Vec<usize>,
    /// Frames that left the controller.
    pub sent: Vec<CanFrame>,
    /// Sent frames are fed back into the receive mailboxes.
    pub loopback: bool,

    pub error_state: BusErrorState,
    pub error_state_checks: Cell<u32>,
    /// Report bus-off from the n-th error-state query on (1-based).
    pub bus_off_at_check: Option<u32>,
    /// State entered once the n-th frame has left the controller.
    pub fault_after_sent: Option<(usize, BusErrorState)>,

    pub irq_masked: bool,
    pub irq_disables: u32,
    pub irq_enables: u32,
    pub arms_while_masked: u32,
    pub triggers_while_masked: u32,

    /// Frames queued for the host side.
    pub host_inbox: VecDeque<CanFrame>,
}

#[allow(dead_code)]
impl SimState {
    fn new(rx_mailboxes: usize, tx_mailboxes: usize) -> Self {
        Self {
            start_count: 0,
            stop_count: 0,
            abort_count: 0,
            rx: vec![None; rx_mailboxes],
            fill_next: 0,
            backlog: VecDeque::new(),
            refill: vec![None; rx_mailboxes],
            released: Vec::new(),
            tx_kinds: vec![MailboxKind::Basic; tx_mailboxes],
            tx: vec![TxSlot::default(); tx_mailboxes],
            tx_latency: 0,
            loads: 0,
            triggers: 0,
            tec_bump_at_trigger: None,
            tec: 0,
            cancelled: Vec::new(),
            sent: Vec::new(),
            loopback: false,
            error_state: BusErrorState::Active,
            error_state_checks: Cell::new(0),
            bus_off_at_check: None,
            fault_after_sent: None,
            irq_masked: false,
            irq_disables: 0,
            irq_enables: 0,
            arms_while_masked: 0,
            triggers_while_masked: 0,
            host_inbox: VecDeque::new(),
        }
    }

    /// Put a raw lane image straight into `mailbox`.
    pub fn load_rx(&mut self, mailbox: usize, frame: RxFrame) {
        self.rx[mailbox] = Some(frame);
    }

    /// Put `payload` (wire order) in `mailbox` as the controller would present it.
    pub fn load_wire(&mut self, mailbox: usize, id: StandardId, payload: &[u8]) {
        self.rx[mailbox] = Some(RxFrame::from_wire(id, payload));
    }

    /// Put a frame on the wire: it lands in the next free mailbox.
    pub fn deliver(&mut self, id: StandardId, payload: &[u8]) {
        self.backlog.push_back(RxFrame::from_wire(id, payload));
        self.drain_backlog();
    }

    /// Segment `bytes` into frames and put them all on the wire.
    pub fn deliver_segmented(&mut self, id: StandardId, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            self.deliver(id, chunk);
        }
    }

    fn drain_backlog(&mut self) {
        let count = self.rx.len();
        while !self.backlog.is_empty() {
            let free = (0..count)
                .map(|offset| (self.fill_next + offset) % count)
                .find(|&mailbox| self.rx[mailbox].is_none());
            let Some(mailbox) = free else {
                return;
            };
            self.rx[mailbox] = self.backlog.pop_front();
            self.fill_next = (mailbox + 1) % count;
        }
    }

    /// Keep the TX mailbox busy for `polls` polls.
    pub fn occupy_tx(&mut self, mailbox: usize, polls: u32) {
        self.tx[mailbox].frame = None;
        self.tx[mailbox].pending = Some(polls);
    }

    fn complete_tx(&mut self, mailbox: usize) {
        let slot = &mut self.tx[mailbox];
        slot.pending = None;
        let Some(mut frame) = slot.frame.take() else {
            return;
        };
        frame.len = slot.armed_len;
        self.sent.push(frame.clone());
        if self.loopback {
            self.deliver(frame.id, frame.payload());
        }
        self.host_inbox.push_back(frame);
        if let Some((after, state)) = self.fault_after_sent {
            if self.sent.len() >= after {
                self.error_state = state;
            }
        }
    }
}

//==================================================================================SIM_PERIPHERAL
#[derive(Clone)]
/// Simulated mailbox controller.
pub struct SimPeripheral {
    state: Rc<RefCell<SimState>>,
}

#[allow(dead_code)]
impl SimPeripheral {
    pub fn new(rx_mailboxes: usize) -> Self {
        Self::with_tx_mailboxes(rx_mailboxes, 1)
    }

    pub fn with_tx_mailboxes(rx_mailboxes: usize, tx_mailboxes: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new(rx_mailboxes, tx_mailboxes))),
        }
    }

    /// Handle on the simulated state, for setup and assertions.
    pub fn state(&self) -> Rc<RefCell<SimState>> {
        self.state.clone()
    }

    /// Host endpoint attached to the same segment.
    pub fn host_bus(&self) -> SimHostBus {
        SimHostBus {
            state: self.state.clone(),
        }
    }
}

impl InterruptControl for SimPeripheral {
    fn disable_interrupts(&mut self) {
        let mut state = self.state.borrow_mut();
        state.irq_masked = true;
        state.irq_disables += 1;
    }

    fn enable_interrupts(&mut self) {
        let mut state = self.state.borrow_mut();
        state.irq_masked = false;
        state.irq_enables += 1;
    }
}

impl CanPeripheral for SimPeripheral {
    fn start(&mut self) {
        self.state.borrow_mut().start_count += 1;
    }

    fn stop(&mut self) {
        self.state.borrow_mut().stop_count += 1;
    }

    fn abort_all(&mut self) {
        let mut state = self.state.borrow_mut();
        state.abort_count += 1;
        for slot in state.tx.iter_mut() {
            slot.pending = None;
            slot.frame = None;
        }
    }

    fn rx_mailbox_count(&self) -> usize {
        self.state.borrow().rx.len()
    }

    fn rx_is_full(&self, mailbox: usize) -> bool {
        self.state.borrow().rx[mailbox].is_some()
    }

    fn rx_frame(&self, mailbox: usize) -> RxFrame {
        self.state.borrow().rx[mailbox].expect("rx_frame on an empty mailbox")
    }

    fn rx_release(&mut self, mailbox: usize) {
        let mut state = self.state.borrow_mut();
        state.released.push(mailbox);
        let refill = state.refill[mailbox];
        state.rx[mailbox] = refill;
        state.drain_backlog();
    }

    fn tx_mailbox_count(&self) -> usize {
        self.state.borrow().tx.len()
    }

    fn tx_mailbox_kind(&self, mailbox: usize) -> MailboxKind {
        self.state.borrow().tx_kinds[mailbox]
    }

    fn tx_is_full(&self, mailbox: usize) -> bool {
        let mut state = self.state.borrow_mut();
        let pending = state.tx[mailbox].pending;
        match pending {
            None => false,
            Some(0) => {
                state.complete_tx(mailbox);
                false
            }
            Some(left) => {
                state.tx[mailbox].pending = Some(left - 1);
                true
            }
        }
    }

    fn tx_load(&mut self, mailbox: usize, frame: &CanFrame) {
        let mut state = self.state.borrow_mut();
        state.loads += 1;
        state.tx[mailbox].frame = Some(frame.clone());
    }

    fn tx_arm(&mut self, mailbox: usize, dlc: usize) {
        let mut state = self.state.borrow_mut();
        if state.irq_masked {
            state.arms_while_masked += 1;
        }
        state.tx[mailbox].armed_len = dlc;
    }

    fn tx_trigger(&mut self, mailbox: usize) {
        let mut state = self.state.borrow_mut();
        if state.irq_masked {
            state.triggers_while_masked += 1;
        }
        state.triggers += 1;
        let latency = state.tx_latency;
        state.tx[mailbox].pending = Some(latency);
        if state.tec_bump_at_trigger == Some(state.triggers) {
            state.tec = state.tec.wrapping_add(8);
        }
    }

    fn tx_cancel(&mut self, mailbox: usize) {
        let mut state = self.state.borrow_mut();
        state.cancelled.push(mailbox);
        state.tx[mailbox].pending = None;
        state.tx[mailbox].frame = None;
    }

    fn tx_error_count(&self) -> u8 {
        self.state.borrow().tec
    }

    fn error_state(&self) -> BusErrorState {
        let state = self.state.borrow();
        let checks = state.error_state_checks.get() + 1;
        state.error_state_checks.set(checks);
        match state.bus_off_at_check {
            Some(at) if checks >= at => BusErrorState::BusOff,
            _ => state.error_state,
        }
    }
}

//==================================================================================SIM_HOST_BUS
#[derive(Clone)]
/// Host-side endpoint of the simulated segment.
pub struct SimHostBus {
    state: Rc<RefCell<SimState>>,
}

impl CanBus for SimHostBus {
    type Error = ();

    async fn send<'a>(&'a mut self, frame: &'a CanFrame) -> Result<(), Self::Error> {
        self.state.borrow_mut().deliver(frame.id, frame.payload());
        Ok(())
    }

    async fn recv(&mut self) -> Result<CanFrame, Self::Error> {
        loop {
            if let Some(frame) = self.state.borrow_mut().host_inbox.pop_front() {
                return Ok(frame);
            }
            yield_now().await;
        }
    }

    fn try_recv(&mut self) -> Result<Option<CanFrame>, Self::Error> {
        Ok(self.state.borrow_mut().host_inbox.pop_front())
    }
}

//==================================================================================SIM_TIMER
#[derive(Clone, Default)]
/// Virtual clock: each millisecond is one scheduler yield.
pub struct SimTimer {
    elapsed_ms: Rc<Cell<u32>>,
    calls: Rc<Cell<u32>>,
}

#[allow(dead_code)]
impl SimTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual milliseconds slept so far.
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms.get()
    }

    /// Number of `delay_ms` calls.
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl BusTimer for SimTimer {
    async fn delay_ms(&mut self, millis: u32) {
        self.calls.set(self.calls.get() + 1);
        for _ in 0..millis {
            yield_now().await;
            self.elapsed_ms.set(self.elapsed_ms.get() + 1);
        }
    }
}
