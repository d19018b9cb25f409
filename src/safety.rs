//! Safety monitor.
//!
//! Runs after every input sample and keeps a latched fault bitmask.  The
//! dispatcher consults it before switching anything on; switching off is
//! always allowed.
//!
//! ## Fault lifecycle
//!
//! 1. The smoothed input voltage rises above [`MAX_INPUT_MV`].
//! 2. The monitor sets the fault bit and logs it once.
//! 3. `O`, and `W` with a non-zero level, answer `>ERR#` while it is set.
//! 4. When the voltage falls back the bit clears and the clearing is logged.

use log::{error, info};

use crate::board::MAX_INPUT_MV;
use crate::error::SafetyFault;

/// A fault that changed state during [`SafetyMonitor::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTransition {
    Set(SafetyFault),
    Cleared(SafetyFault),
}

/// Latched safety faults.
#[derive(Debug, Clone, Default)]
pub struct SafetyMonitor {
    faults: u8,
}

impl SafetyMonitor {
    pub const fn new() -> Self {
        Self { faults: 0 }
    }

    /// Evaluate all conditions against the latest smoothed input voltage.
    pub fn evaluate(&mut self, input_mv: i32) -> Option<FaultTransition> {
        self.eval_fault(SafetyFault::InputOvervoltage, input_mv > MAX_INPUT_MV)
    }

    pub fn faults(&self) -> u8 {
        self.faults
    }

    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Whether outputs may currently be switched on.
    pub fn check_switch_on(&self) -> Result<(), SafetyFault> {
        if self.has_fault(SafetyFault::InputOvervoltage) {
            Err(SafetyFault::InputOvervoltage)
        } else {
            Ok(())
        }
    }

    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) -> Option<FaultTransition> {
        let latched = self.has_fault(fault);
        if condition && !latched {
            error!("SAFETY FAULT SET: {fault}");
            self.faults |= fault.mask();
            Some(FaultTransition::Set(fault))
        } else if !condition && latched {
            info!("SAFETY FAULT CLEARED: {fault}");
            self.faults &= !fault.mask();
            Some(FaultTransition::Cleared(fault))
        } else {
            None
        }
    }
}
