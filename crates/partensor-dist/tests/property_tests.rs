//! Property-based tests for manifests and single-rank exchanges.

use partensor_dist::*;
use proptest::prelude::*;
use scirs2_core::ndarray_ext::Array2;

fn neighbor_lists() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..64, 0..6), 1..6)
}

proptest! {
    #[test]
    fn prop_manifest_groups_rows_by_peer(lists in neighbor_lists()) {
        let m = RowManifest::from_neighbor_lists(lists.clone());

        prop_assert_eq!(m.npeers(), lists.len());
        prop_assert_eq!(m.total(), lists.iter().map(Vec::len).sum::<usize>());
        for (peer, list) in lists.iter().enumerate() {
            prop_assert_eq!(m.peer_rows(peer), list.as_slice());
        }

        let rebuilt = RowManifest::new(m.rows().to_vec(), m.counts().to_vec()).unwrap();
        prop_assert_eq!(rebuilt, m);
    }

    #[test]
    fn prop_self_update_copies_owned_rows(
        nowned in 1usize..12,
        nf in 1usize..4,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        // local layout: nowned owned rows followed by one ghost per pick
        let owned: Vec<usize> = (0..nowned).collect();
        let mut send = Vec::new();
        let mut recv = Vec::new();
        for (k, pick) in picks.iter().enumerate() {
            send.push(owned[pick.index(nowned)]);
            recv.push(nowned + k);
        }
        let nlocal = nowned + picks.len();

        let layout = ModeLayout {
            mat_start: 0,
            mat_end: nowned,
            own_start: 0,
            nowned,
            send: RowManifest::from_neighbor_lists(vec![send.clone()]),
            recv: RowManifest::from_neighbor_lists(vec![recv]),
        };
        let layer = LocalCluster::new(1).into_comms().remove(0);
        let grid = LocalCluster::new(1).into_comms().remove(0);
        let part = PartitionDescriptor::new(vec![layout], vec![layer], grid).unwrap();
        let ex = RowExchange::new(&part).with_config(ExchangeConfig::default().with_check_manifests(true));

        let global = Array2::from_shape_fn((nowned, nf), |(i, j)| (i * nf + j) as f64);
        let mut local = Array2::<f64>::zeros((nlocal, nf));
        let mut bufs = ExchangeBuffers::for_partition(&part, nf);
        ex.update_rows(0, &mut bufs, &mut local, &global).unwrap();

        for i in 0..nowned {
            prop_assert_eq!(local.row(i), global.row(i));
        }
        for (k, &g) in send.iter().enumerate() {
            prop_assert_eq!(local.row(nowned + k), global.row(g));
        }
    }
}
