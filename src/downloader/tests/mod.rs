use super::test_helpers::{FakeEngine, Script, create_test_downloader, test_config};
use super::*;
use crate::types::{DownloadRequest, Event, JobId, MediaKind, Status};
use std::time::Duration;
