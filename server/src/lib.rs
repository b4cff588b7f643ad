// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
pub mod availability;
pub mod database;
pub mod handlers;
pub mod palette;
pub mod routes;
