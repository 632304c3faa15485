// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! DMA engine status.

use crate::synchronization::{self, InitStateLock};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// DMA interfaces.
pub mod interface {
    /// Non-blocking status query.
    pub trait Status {
        /// Whether a transfer is in flight on the channel the display uses.
        fn is_busy(&self) -> bool;
    }
}

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Used until the BSP registers the real channel: never busy.
struct IdleDma;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static IDLE_DMA: IdleDma = IdleDma;

static CUR_DMA_STATUS: InitStateLock<&'static (dyn interface::Status + Sync)> =
    InitStateLock::new(&IDLE_DMA);

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl interface::Status for IdleDma {
    fn is_busy(&self) -> bool {
        false
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::interface::ReadWriteEx;

/// Register a new DMA status source.
pub fn register_dma_status(new_status: &'static (dyn interface::Status + Sync)) {
    CUR_DMA_STATUS.write(|status| *status = new_status);
}

/// Return a reference to the currently registered DMA status source.
pub fn dma_status() -> &'static dyn interface::Status {
    CUR_DMA_STATUS.read(|status| *status)
}
