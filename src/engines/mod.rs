// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod card_parser;
pub mod maps_engine;
pub mod traits;
