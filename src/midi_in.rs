//! MIDI input
//!
//! Opens one input port with `midir` and forwards every message, classified as a
//! `ControlEvent`, into a `ControlSink`. The callback runs on midir's thread; the sink
//! is responsible for synchronization (see `SharedMapper`).

use anyhow::anyhow;
use feedbackcam_engine::config::MidiConfig;
use feedbackcam_engine::{ControlEvent, ControlSink};
use midir::{Ignore, MidiInput, MidiInputConnection};

use crate::{logi, logw};

const CLIENT_NAME: &str = "feedbackcam-midi";
const CONNECTION_NAME: &str = "feedbackcam-midi-in";

/// Live input connection. Dropping it closes the port.
pub struct MidiIn {
    conn: MidiInputConnection<()>,
    port_name: String,
}

impl MidiIn {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn close(self) {
        let _ = self.conn.close();
        logi!("MIDI", "closed input: {}", self.port_name);
    }
}

fn ignore_flags(cfg: &MidiConfig) -> Ignore {
    match (cfg.ignore_sysex, cfg.ignore_timing, cfg.ignore_active_sense) {
        (false, false, false) => Ignore::None,
        (true, false, false) => Ignore::Sysex,
        (false, true, false) => Ignore::Time,
        (true, true, false) => Ignore::SysexAndTime,
        (false, false, true) => Ignore::ActiveSense,
        (true, false, true) => Ignore::SysexAndActiveSense,
        (false, true, true) => Ignore::TimeAndActiveSense,
        (true, true, true) => Ignore::All,
    }
}

/// Names of all available input ports, in midir's order.
pub fn list_ports() -> anyhow::Result<Vec<String>> {
    let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| anyhow!("MIDI init failed: {e}"))?;
    Ok(midi_in
        .ports()
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "Unknown".into()))
        .collect())
}

/// Pick a port index: name match first, then the configured index, then the first port.
pub fn choose_port(names: &[String], cfg: &MidiConfig) -> Option<usize> {
    if names.is_empty() {
        return None;
    }

    if let Some(pref) = cfg.port_name_contains.as_ref().map(|s| s.to_lowercase()) {
        if let Some(i) = names.iter().position(|n| n.to_lowercase().contains(&pref)) {
            return Some(i);
        }
        logw!("MIDI", "no port name contains '{pref}', falling back to index {}", cfg.port_index);
    }

    if cfg.port_index < names.len() {
        Some(cfg.port_index)
    } else {
        logw!(
            "MIDI",
            "port index {} out of range ({} ports), using port 0",
            cfg.port_index,
            names.len()
        );
        Some(0)
    }
}

fn make_callback<S: ControlSink + 'static>(sink: S, verbose: bool) -> impl FnMut(u64, &[u8], &mut ()) + Send + 'static {
    move |stamp, msg, _| {
        let Some(ev) = ControlEvent::from_midi(msg) else {
            return;
        };
        if verbose {
            logi!(
                "MIDI",
                "{} ch={} ctl={} val={} stamp={}us bytes={:02X?}",
                ev.kind.as_str(),
                ev.channel,
                ev.control,
                ev.value,
                stamp,
                msg
            );
        }
        sink.on_control_event(ev);
    }
}

/// Open the input described by `cfg` and forward events into `sink`.
///
/// Returns `Ok(None)` when there is nothing to connect to.
pub fn connect<S: ControlSink + 'static>(cfg: &MidiConfig, sink: S) -> anyhow::Result<Option<MidiIn>> {
    let mut midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| anyhow!("MIDI init failed: {e}"))?;
    midi_in.ignore(ignore_flags(cfg));

    if let Some(name) = cfg.virtual_port.as_deref() {
        #[cfg(unix)]
        {
            use midir::os::unix::VirtualInput;
            let conn = midi_in
                .create_virtual(name, make_callback(sink, cfg.verbose), ())
                .map_err(|e| anyhow!("failed to open virtual port '{name}': {e}"))?;
            logi!("MIDI", "opened virtual input: {name}");
            return Ok(Some(MidiIn {
                conn,
                port_name: name.to_string(),
            }));
        }
        #[cfg(not(unix))]
        logw!("MIDI", "virtual port '{name}' requested but not supported on this platform");
    }

    let ports = midi_in.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "Unknown".into()))
        .collect();

    if names.is_empty() {
        logi!("MIDI", "No MIDI input ports detected.");
        return Ok(None);
    }
    for (i, n) in names.iter().enumerate() {
        logi!("MIDI", "input port {i}: {n}");
    }

    let Some(idx) = choose_port(&names, cfg) else {
        return Ok(None);
    };
    let port_name = names[idx].clone();
    logi!("MIDI", "Connecting input: {port_name}");

    let conn = midi_in
        .connect(&ports[idx], CONNECTION_NAME, make_callback(sink, cfg.verbose), ())
        .map_err(|e| anyhow!("failed to connect MIDI input '{port_name}': {e}"))?;

    Ok(Some(MidiIn { conn, port_name }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedbackcam_engine::{ParameterMapper, SharedMapper};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_picks_second_port() {
        let cfg = MidiConfig::default();
        assert_eq!(choose_port(&names(&["Midi Through", "nanoKONTROL2"]), &cfg), Some(1));
    }

    #[test]
    fn name_match_wins_over_index() {
        let cfg = MidiConfig {
            port_name_contains: Some("KONTROL".into()),
            port_index: 0,
            ..MidiConfig::default()
        };
        let ports = names(&["Midi Through", "IAC Bus", "nanoKONTROL2 SLIDER/KNOB"]);
        assert_eq!(choose_port(&ports, &cfg), Some(2));
    }

    #[test]
    fn out_of_range_index_falls_back_to_first() {
        let cfg = MidiConfig::default();
        assert_eq!(choose_port(&names(&["only one"]), &cfg), Some(0));
        assert_eq!(choose_port(&[], &cfg), None);
    }

    #[test]
    fn ignore_flags_cover_every_combination() {
        let mut cfg = MidiConfig::default();
        assert_eq!(ignore_flags(&cfg), Ignore::None);
        cfg.ignore_sysex = true;
        cfg.ignore_timing = true;
        cfg.ignore_active_sense = true;
        assert_eq!(ignore_flags(&cfg), Ignore::All);
    }

    #[test]
    fn callback_feeds_the_sink() {
        let shared = SharedMapper::new(ParameterMapper::default());
        let mut cb = make_callback(shared.clone(), false);
        cb(0, &[0xB0, 16, 127], &mut ());
        cb(1, &[], &mut ());
        cb(2, &[0xF8], &mut ());

        assert_eq!(shared.queue_len(), 2);
        assert_eq!(shared.drain_and_apply().unipolar, 1.0);
    }
}
