// src/openbci.rs
use anyhow::{anyhow, Context, Result};
use libloading::Library;
use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::ffi::CString;
use std::os::raw::{c_char, c_double, c_int};
use std::thread;
use std::time::{Duration, Instant};
use crate::drivers::{AlphaError, Sample, SampleSource};
const BOARD_ID_CYTON_DAISY: c_int = 2;
const PRESET_DEFAULT: c_int = 0;
const STREAM_RINGBUF_PACKETS: c_int = 450_000;
const POLL_INTERVAL: Duration = Duration::from_millis(5);
#[derive(Serialize)]
struct BrainFlowInputParams {
    serial_port: String,
    mac_address: String,
    ip_address: String,
    ip_address_aux: String,
    ip_address_anc: String,
    ip_port: i32,
    ip_port_aux: i32,
    ip_port_anc: i32,
    ip_protocol: i32,
    other_info: String,
    timeout: i32,
    serial_number: String,
    file: String,
    file_aux: String,
    file_anc: String,
    master_board: i32,
}
impl BrainFlowInputParams {
    fn for_serial(port: &str) -> Self {
        Self {
            serial_port: port.to_string(),
            mac_address: String::new(),
            ip_address: String::new(),
            ip_address_aux: String::new(),
            ip_address_anc: String::new(),
            ip_port: 0,
            ip_port_aux: 0,
            ip_port_anc: 0,
            ip_protocol: 0,
            other_info: String::new(),
            timeout: 0,
            serial_number: String::new(),
            file: String::new(),
            file_aux: String::new(),
            file_anc: String::new(),
            master_board: -100, // NO_BOARD
        }
    }
}
struct BrainFlowApi {
    #[allow(dead_code)]
    lib: Library,
    prepare_session: unsafe extern "C" fn(c_int, *const c_char) -> c_int,
    start_stream: unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char) -> c_int,
    stop_stream: unsafe extern "C" fn(c_int, *const c_char) -> c_int,
    release_session: unsafe extern "C" fn(c_int, *const c_char) -> c_int,
    get_sampling_rate: unsafe extern "C" fn(c_int, c_int, *mut c_int) -> c_int,
    get_num_rows: unsafe extern "C" fn(c_int, c_int, *mut c_int) -> c_int,
    get_eeg_channels: unsafe extern "C" fn(c_int, c_int, *mut c_int, *mut c_int) -> c_int,
    get_timestamp_channel: unsafe extern "C" fn(c_int, c_int, *mut c_int) -> c_int,
    get_board_data_count: unsafe extern "C" fn(c_int, *mut c_int, c_int, *const c_char) -> c_int,
    get_board_data:
        unsafe extern "C" fn(c_int, c_int, *mut c_double, c_int, *const c_char) -> c_int,
}
impl BrainFlowApi {
    fn load() -> Result<Self> {
        let lib = unsafe { Library::new(libloading::library_filename("BoardController")) }
            .context("BrainFlow BoardController library not found in working directory")?;
        // Safety: signatures follow the BrainFlow C API of the official package.
        unsafe {
            Ok(Self {
                prepare_session: *lib.get(b"prepare_session\0")?,
                start_stream: *lib.get(b"start_stream\0")?,
                stop_stream: *lib.get(b"stop_stream\0")?,
                release_session: *lib.get(b"release_session\0")?,
                get_sampling_rate: *lib.get(b"get_sampling_rate\0")?,
                get_num_rows: *lib.get(b"get_num_rows\0")?,
                get_eeg_channels: *lib.get(b"get_eeg_channels\0")?,
                get_timestamp_channel: *lib.get(b"get_timestamp_channel\0")?,
                get_board_data_count: *lib.get(b"get_board_data_count\0")?,
                get_board_data: *lib.get(b"get_board_data\0")?,
                lib,
            })
        }
    }
    fn instance() -> Result<&'static BrainFlowApi> {
        static API: OnceCell<BrainFlowApi> = OnceCell::new();
        API.get_or_try_init(Self::load)
    }
    fn check(code: c_int, ctx: &str) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(anyhow!("{ctx} failed (BrainFlow code {code})"))
        }
    }
    fn prepare(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe { (self.prepare_session)(board_id, input.as_ptr()) },
            "prepare_session",
        )
    }
    fn start_stream(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe {
                (self.start_stream)(
                    STREAM_RINGBUF_PACKETS,
                    std::ptr::null(),
                    board_id,
                    input.as_ptr(),
                )
            },
            "start_stream",
        )
    }
    fn stop_stream(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe { (self.stop_stream)(board_id, input.as_ptr()) },
            "stop_stream",
        )
    }
    fn release(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe { (self.release_session)(board_id, input.as_ptr()) },
            "release_session",
        )
    }
    fn sampling_rate(&self, board_id: c_int) -> Result<c_int> {
        let mut rate: c_int = 0;
        Self::check(
            unsafe { (self.get_sampling_rate)(board_id, PRESET_DEFAULT, &mut rate as *mut c_int) },
            "get_sampling_rate",
        )?;
        Ok(rate)
    }
    fn num_rows(&self, board_id: c_int) -> Result<c_int> {
        let mut rows: c_int = 0;
        Self::check(
            unsafe { (self.get_num_rows)(board_id, PRESET_DEFAULT, &mut rows as *mut c_int) },
            "get_num_rows",
        )?;
        Ok(rows)
    }
    fn timestamp_row(&self, board_id: c_int) -> Result<c_int> {
        let mut row: c_int = 0;
        Self::check(
            unsafe {
                (self.get_timestamp_channel)(board_id, PRESET_DEFAULT, &mut row as *mut c_int)
            },
            "get_timestamp_channel",
        )?;
        Ok(row)
    }
    fn eeg_channels(&self, board_id: c_int, max_channels: usize) -> Result<Vec<c_int>> {
        let mut out_len: c_int = 0;
        let mut buf = vec![0 as c_int; max_channels.max(32)];
        Self::check(
            unsafe {
                (self.get_eeg_channels)(
                    board_id,
                    PRESET_DEFAULT,
                    buf.as_mut_ptr(),
                    &mut out_len as *mut c_int,
                )
            },
            "get_eeg_channels",
        )?;
        buf.truncate(out_len.max(0) as usize);
        Ok(buf)
    }
    fn data_count(&self, board_id: c_int, input: &CString) -> Result<usize> {
        let mut count: c_int = 0;
        Self::check(
            unsafe {
                (self.get_board_data_count)(
                    PRESET_DEFAULT,
                    &mut count as *mut c_int,
                    board_id,
                    input.as_ptr(),
                )
            },
            "get_board_data_count",
        )?;
        Ok(count.max(0) as usize)
    }
    /// Removes `count` samples from BrainFlow's ring buffer; layout is rows x count.
    fn take_board_data(
        &self,
        board_id: c_int,
        num_rows: usize,
        input: &CString,
        count: usize,
    ) -> Result<Vec<f64>> {
        let mut buffer = vec![0.0f64; num_rows * count];
        Self::check(
            unsafe {
                (self.get_board_data)(
                    count as c_int,
                    PRESET_DEFAULT,
                    buffer.as_mut_ptr(),
                    board_id,
                    input.as_ptr(),
                )
            },
            "get_board_data",
        )?;
        Ok(buffer)
    }
}
/// BrainFlow-backed OpenBCI Cyton + Daisy session reduced to a single EEG channel.
pub struct OpenBciSource {
    port_name: String,
    api: &'static BrainFlowApi,
    input_json: CString,
    eeg_channels: Vec<c_int>,
    eeg_row: usize,
    timestamp_row: usize,
    num_rows: usize,
    sample_rate_hz: f64,
    is_streaming: bool,
    released: bool,
}
impl OpenBciSource {
    /// Prepares a session on `port_name` and selects the `channel_index`-th EEG channel.
    ///
    /// The session is owned by the returned value from the moment `prepare` succeeds,
    /// so a failed board lookup still releases it on drop.
    pub fn connect(port_name: &str, channel_index: usize) -> Result<Self> {
        let api = BrainFlowApi::instance()?;
        let params = BrainFlowInputParams::for_serial(port_name);
        let json = serde_json::to_string(&params)?;
        let input_json =
            CString::new(json).context("failed to encode BrainFlow input params to C string")?;
        api.prepare(BOARD_ID_CYTON_DAISY, &input_json)?;
        let mut source = Self {
            port_name: port_name.to_string(),
            api,
            input_json,
            eeg_channels: Vec::new(),
            eeg_row: 0,
            timestamp_row: 0,
            num_rows: 0,
            sample_rate_hz: 0.0,
            is_streaming: false,
            released: false,
        };
        source.describe_board(channel_index)?;
        info!(
            "BrainFlow session on {port_name}: {} Hz, {} EEG channels, using row {}",
            source.sample_rate_hz,
            source.eeg_channels.len(),
            source.eeg_row
        );
        Ok(source)
    }
    fn describe_board(&mut self, channel_index: usize) -> Result<()> {
        self.sample_rate_hz = f64::from(self.api.sampling_rate(BOARD_ID_CYTON_DAISY)?);
        self.num_rows = self.api.num_rows(BOARD_ID_CYTON_DAISY)?.max(0) as usize;
        self.eeg_channels = self.api.eeg_channels(BOARD_ID_CYTON_DAISY, self.num_rows)?;
        self.timestamp_row = self.api.timestamp_row(BOARD_ID_CYTON_DAISY)?.max(0) as usize;
        self.eeg_row = self
            .eeg_channels
            .get(channel_index)
            .map(|row| (*row).max(0) as usize)
            .ok_or_else(|| {
                AlphaError::InvalidConfig(format!(
                    "channel index {channel_index} out of range for {} EEG channels",
                    self.eeg_channels.len()
                ))
            })?;
        Ok(())
    }
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn start_stream(&mut self) -> Result<()> {
        if !self.is_streaming {
            self.api
                .start_stream(BOARD_ID_CYTON_DAISY, &self.input_json)?;
            self.is_streaming = true;
        }
        Ok(())
    }
    pub fn stop_stream(&mut self) -> Result<()> {
        if !self.released {
            if self.is_streaming {
                self.api
                    .stop_stream(BOARD_ID_CYTON_DAISY, &self.input_json)?;
                self.is_streaming = false;
            }
            self.api.release(BOARD_ID_CYTON_DAISY, &self.input_json)?;
            self.released = true;
        }
        Ok(())
    }
    fn drain(&mut self, timeout: Duration) -> Result<Vec<Sample>> {
        let deadline = Instant::now() + timeout;
        let mut count = self.api.data_count(BOARD_ID_CYTON_DAISY, &self.input_json)?;
        while count == 0 && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
            count = self.api.data_count(BOARD_ID_CYTON_DAISY, &self.input_json)?;
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let data =
            self.api
                .take_board_data(BOARD_ID_CYTON_DAISY, self.num_rows, &self.input_json, count)?;
        if self.eeg_row >= self.num_rows || self.timestamp_row >= self.num_rows {
            return Err(anyhow!(
                "board rows out of range: eeg {} / timestamp {} of {}",
                self.eeg_row,
                self.timestamp_row,
                self.num_rows
            ));
        }
        Ok((0..count)
            .map(|i| {
                Sample::new(
                    data[self.eeg_row * count + i],
                    data[self.timestamp_row * count + i],
                )
            })
            .collect())
    }
}
impl SampleSource for OpenBciSource {
    fn pull_chunk(&mut self, timeout: Duration) -> Result<Vec<Sample>, AlphaError> {
        let samples = self
            .drain(timeout)
            .map_err(|err| AlphaError::Source(format!("{err:#}")))?;
        if samples.is_empty() {
            return Err(AlphaError::timed_out(timeout));
        }
        Ok(samples)
    }
    fn channel_count(&self) -> usize {
        self.eeg_channels.len()
    }
}
impl Drop for OpenBciSource {
    fn drop(&mut self) {
        if let Err(err) = self.stop_stream() {
            warn!("failed to release BrainFlow session: {err:#}");
        }
    }
}
