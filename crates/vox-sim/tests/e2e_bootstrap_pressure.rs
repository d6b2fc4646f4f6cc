use vox_codec::edit::parse_edit_packet;
use vox_sim::scenarios::{BOOTSTRAP_PRESSURE, SMOKE};
use vox_sim::workload::run_scenario;

#[test]
fn backlog_never_exceeds_its_bound_and_evicts_the_overflow() {
    let scenario = BOOTSTRAP_PRESSURE;
    let run = run_scenario(0xB007, &scenario).expect("scenario runs");

    assert_eq!(run.max_pending_seen, scenario.max_pending_messages);
    assert_eq!(
        run.stats.evicted as usize,
        scenario.discovery_after - scenario.max_pending_messages
    );
    assert_eq!(run.stats.replayed as usize, scenario.max_pending_messages);

    let kept = scenario.edits - run.stats.evicted as usize;
    let delivered = run.delivered_records().expect("well formed packets");
    assert_eq!(delivered, kept * usize::from(scenario.servers));
    assert!(run
        .packets
        .iter()
        .all(|(_, bytes)| bytes.len() <= scenario.max_packet_size));
}

#[test]
fn smoke_scenario_delivers_every_edit_to_every_server() {
    let run = run_scenario(0x5A0C, &SMOKE).expect("scenario runs");
    assert_eq!(run.stats.captured, 0);
    assert_eq!(run.stats.evicted, 0);
    assert_eq!(
        run.delivered_records().expect("well formed packets"),
        SMOKE.edits * usize::from(SMOKE.servers)
    );
    assert_eq!(run.stats.packets_released as usize, run.packets.len());
    let header_sequences_start_at_zero = run
        .packets
        .iter()
        .filter_map(|(_, bytes)| parse_edit_packet(bytes).ok())
        .any(|(header, _)| header.sequence == 0);
    assert!(header_sequences_start_at_zero);
}
