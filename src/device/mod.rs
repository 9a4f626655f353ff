// PageTurn - Cross-Device Reading Client
// Copyright (C) 2026 PageTurn contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Device identity
//!
//! Progress ownership is disambiguated per device; this module issues the
//! stable identifier and label that scope every library request.

pub mod identity;

pub use identity::{DeviceIdentity, DeviceManager, LabelPrompt, NoPrompt};
