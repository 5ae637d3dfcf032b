// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: conversion of captured files to the canonical page raster.

pub mod normalize;

pub use normalize::{RasterInfo, normalize_page};
