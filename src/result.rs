// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Assembles the end-of-run summary: topology shape, run parameters, packet/link/queue
//! statistics, per-job step-time percentiles and the optional mice FCT summary.

use serde::Serialize;

use crate::config::TopologyConfig;
use crate::network::Network;
use crate::stats::percentile;

#[derive(Debug, Clone, Serialize)]
pub struct TopologySummary {
    pub kind: String,
    pub host_count: usize,
    pub switch_count: usize,
    pub link_count: usize,
    pub failed_link_count: usize,
    pub affected_switch_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParametersSummary {
    pub routing_mode: String,
    pub failure_percent: f64,
    pub ecmp_flowlet_n_packets: u32,
    pub mtu: u32,
    pub ttl: u32,
    pub scenario_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkUtilization {
    pub name: String,
    pub bytes_transmitted: u64,
    pub utilization: f64,
    pub peak_queue_len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PacketSummary {
    pub total_count: u64,
    pub delivered_count: u64,
    pub delivered_percent: f64,
    pub dropped_count: u64,
    pub dropped_percent: f64,
    pub min_hops: u32,
    pub avg_hops: f64,
    pub max_hops: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: u64,
    pub job_name: String,
    pub step_count: usize,
    pub step_time_ms_avg: f64,
    pub step_time_ms_p50: f64,
    pub step_time_ms_p95: f64,
    pub step_time_ms_p99: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MiceSummaryView {
    pub flow_count: usize,
    pub fct_avg_ms: f64,
    pub fct_p95_ms: f64,
    pub fct_p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub topology: TopologySummary,
    pub parameters: ParametersSummary,
    pub end_time: f64,
    pub packets: PacketSummary,
    pub link_utilization: Vec<LinkUtilization>,
    pub peak_queue_len_max: usize,
    pub peak_queue_len_avg: f64,
    pub jobs: Vec<JobSummary>,
    pub mice: Option<MiceSummaryView>,
    pub packet_timeline: Vec<(f64, u32)>,
}

fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

fn job_summary(metrics: &crate::workload::entities::JobMetrics) -> JobSummary {
    let mut times = metrics.step_times_ms();
    let avg = crate::stats::mean(&times);
    let p50 = percentile(&mut times, 50.0);
    let p95 = percentile(&mut times, 95.0);
    let p99 = percentile(&mut times, 99.0);
    JobSummary {
        job_id: metrics.job_id,
        job_name: metrics.job_name.clone(),
        step_count: metrics.steps.len(),
        step_time_ms_avg: avg,
        step_time_ms_p50: p50,
        step_time_ms_p95: p95,
        step_time_ms_p99: p99,
    }
}

/// Builds the end-of-run summary from a `Network` that has already finished `run()`.
/// `host_count`/`switch_count`/`failed_link_count` come from the topology builder since
/// `Network` itself does not distinguish host nodes from switch nodes after construction.
/// `topology`/`scenario_name` are carried through for the parameters summary rather than
/// re-derived from `net`, which has no notion of the config it was built from.
pub fn build(
    net: &Network,
    host_count: usize,
    switch_count: usize,
    failed_link_count: usize,
    topology: &TopologyConfig,
    scenario_name: &str,
) -> ResultSummary {
    let end_time = net.scheduler.end_time().unwrap_or(0.0);

    let link_utilization: Vec<LinkUtilization> = net
        .links
        .iter()
        .map(|link| {
            let utilization = if end_time > 0.0 {
                link.accumulated_transmitting_time / end_time
            } else {
                0.0
            };
            let peak_queue_len = link
                .endpoints
                .map(|(a, b)| {
                    let pa = net.nodes[a.node].ports[a.port].peak_queue_len;
                    let pb = net.nodes[b.node].ports[b.port].peak_queue_len;
                    pa.max(pb)
                })
                .unwrap_or(0);
            LinkUtilization {
                name: link.name.clone(),
                bytes_transmitted: link.accumulated_bytes_transmitted,
                utilization,
                peak_queue_len,
            }
        })
        .collect();

    let affected_switch_count = net
        .links
        .iter()
        .filter(|link| link.failed)
        .filter_map(|link| link.endpoints)
        .flat_map(|(a, b)| [a.node, b.node])
        .filter(|&n| matches!(net.nodes[n].kind, crate::node::NodeKind::Switch(_)))
        .collect::<std::collections::HashSet<_>>()
        .len();

    let all_peaks: Vec<usize> = net.nodes.iter().flat_map(|n| n.ports.iter().map(|p| p.peak_queue_len)).collect();
    let peak_queue_len_max = all_peaks.iter().copied().max().unwrap_or(0);
    let peak_queue_len_avg = if all_peaks.is_empty() {
        0.0
    } else {
        all_peaks.iter().sum::<usize>() as f64 / all_peaks.len() as f64
    };

    ResultSummary {
        topology: TopologySummary {
            kind: "ai-factory-su".to_string(),
            host_count,
            switch_count,
            link_count: net.links.len(),
            failed_link_count,
            affected_switch_count,
        },
        parameters: ParametersSummary {
            routing_mode: topology.routing.mode.clone(),
            failure_percent: topology.links.failure_percent,
            ecmp_flowlet_n_packets: topology.routing.ecmp_flowlet_n_packets,
            mtu: topology.mtu,
            ttl: topology.ttl,
            scenario_name: scenario_name.to_string(),
        },
        end_time,
        packets: PacketSummary {
            total_count: net.stats.total_count,
            delivered_count: net.stats.delivered_count,
            delivered_percent: percent_of(net.stats.delivered_count, net.stats.total_count),
            dropped_count: net.stats.dropped_count,
            dropped_percent: percent_of(net.stats.dropped_count, net.stats.total_count),
            min_hops: net.stats.min_route_length(),
            avg_hops: net.stats.avg_route_length(),
            max_hops: net.stats.max_route_length(),
        },
        link_utilization,
        peak_queue_len_max,
        peak_queue_len_avg,
        jobs: net.job_metrics.iter().map(job_summary).collect(),
        mice: net.mice_summary.as_ref().map(|m| MiceSummaryView {
            flow_count: m.flow_count,
            fct_avg_ms: m.fct_avg_ms,
            fct_p95_ms: m.fct_p95_ms,
            fct_p99_ms: m.fct_p99_ms,
        }),
        packet_timeline: net.packet_timeline.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AiFactorySuConfig, BandwidthConfig, LinksConfig, RoutingConfig};
    use crate::ip::Ipv4Addr;
    use crate::node::RoutingMode;
    use crate::packet::Protocol;

    fn test_topology_config() -> TopologyConfig {
        TopologyConfig {
            kind: "ai-factory-su".into(),
            max_path: 4,
            mtu: 1500,
            ttl: 64,
            seed: 0,
            routing: RoutingConfig { mode: "ecmp".into(), ecmp_flowlet_n_packets: 0 },
            links: LinksConfig {
                failure_percent: 0.0,
                bandwidth_bps: BandwidthConfig { server_to_leaf: 1e9, leaf_to_spine: 4e9 },
            },
            ai_factory_su: AiFactorySuConfig {
                leaves: 1,
                spines: 1,
                servers_per_leaf: 1,
                server_parallel_links: 1,
                leaf_to_spine_parallel_links: 1,
            },
        }
    }

    #[test]
    fn packet_counts_match_network_stats() {
        let mut net = Network::new();
        let h0 = net.create_host("h0", Ipv4Addr::new(10, 0, 0, 1), RoutingMode::StaticHash, 1500, 64, 1);
        let h1 = net.create_host("h1", Ipv4Addr::new(10, 0, 0, 2), RoutingMode::StaticHash, 1500, 64, 2);
        let p0 = net.add_port(h0);
        let p1 = net.add_port(h1);
        let link = net.create_link("l0", 1_000_000.0, 0.0);
        net.connect(h0, p0, link).unwrap();
        net.connect(h1, p1, link).unwrap();
        net.install_route(h0, "10.0.0.2/32".parse().unwrap(), p0);
        let dst = net.host_ip(h1);
        net.host_send(h0, 1, dst, 1000, 2000, 1000, Protocol::Tcp);
        net.run();

        let topo = test_topology_config();
        let summary = build(&net, 2, 0, 0, &topo, "ai-factory-su-workload1-dp-heavy");
        assert_eq!(summary.packets.total_count, 1);
        assert_eq!(summary.packets.delivered_count, 1);
        assert!((summary.packets.delivered_percent - 100.0).abs() < 1e-9);
        assert_eq!(summary.link_utilization.len(), 1);
        assert!(summary.link_utilization[0].bytes_transmitted > 0);
        assert_eq!(summary.parameters.routing_mode, "ecmp");
    }

    #[test]
    fn empty_network_has_zero_utilization() {
        let net = Network::new();
        let topo = test_topology_config();
        let summary = build(&net, 0, 0, 0, &topo, "ai-factory-su-workload1-dp-heavy");
        assert!(summary.link_utilization.is_empty());
        assert_eq!(summary.packets.total_count, 0);
        assert_eq!(summary.peak_queue_len_max, 0);
    }
}
