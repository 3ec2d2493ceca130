use coralai_core::{
    AllocationState, Channel, ChannelData, ChannelKey, DType, World, WorldConfig, WorldError,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_world(rng: &mut SmallRng, width: usize, height: usize) -> (World<f32>, usize) {
    let mut world = World::new(width, height).expect("world");
    let mut expected = 0;
    let channel_count = rng.random_range(1..6);
    for c in 0..channel_count {
        let id = format!("ch{c}");
        if rng.random_bool(0.4) {
            let grouped = world.declare_channel(Channel::new(id)).expect("declare group");
            for s in 0..rng.random_range(1..4) {
                let depth = rng.random_range(1..4);
                grouped
                    .add_subchannel(format!("s{s}"))
                    .expect("sub")
                    .set_depth(depth)
                    .expect("depth");
                expected += depth;
            }
        } else {
            let depth = rng.random_range(1..5);
            let mut channel = Channel::new(id).with_depth(depth);
            if rng.random_bool(0.3) {
                channel = channel.reserved();
            }
            world.declare_channel(channel).expect("declare");
            expected += depth;
        }
    }
    (world, expected)
}

#[test]
fn index_tree_partitions_buffer_depth() {
    let mut rng = SmallRng::seed_from_u64(0xC0DA);
    for _ in 0..32 {
        let (mut world, expected_depth) = random_world(&mut rng, 5, 4);
        let tree = world.allocate().expect("allocate");
        assert_eq!(tree.depth(), expected_depth);

        let mut covered = vec![0usize; expected_depth];
        let mut cursor = 0;
        for (_, node) in tree.iter() {
            let range = node.indices();
            assert_eq!(range.start, cursor, "ranges must be contiguous");
            cursor = range.end;
            for index in range.clone() {
                covered[index] += 1;
            }
            if !node.subchannels().is_empty() {
                let concatenated: Vec<usize> = node
                    .subchannels()
                    .iter()
                    .flat_map(|(_, child)| child.indices())
                    .collect();
                assert_eq!(concatenated, range.collect::<Vec<_>>());
            }
        }
        assert_eq!(cursor, expected_depth);
        assert!(covered.iter().all(|&count| count == 1));
        assert_eq!(world.buffer().expect("buffer").len(), 5 * 4 * expected_depth);
    }
}

#[test]
fn second_allocation_leaves_world_identical() {
    let mut world = WorldConfig::coral(6, 5).build::<f32>().expect("build");
    world.allocate().expect("allocate");
    world.paint_disc("energy", 2, 2, 2, 1.5).expect("paint");
    world.fill(("com", "c"), 0.25).expect("fill");

    let buffer_before = world.buffer().expect("buffer").to_vec();
    let tree_before = world.index().expect("index").clone();

    assert_eq!(world.allocate().unwrap_err(), WorldError::DoubleAllocation);
    assert_eq!(world.state(), AllocationState::Allocated);
    assert_eq!(world.buffer().expect("buffer"), buffer_before.as_slice());
    assert_eq!(world.index().expect("index"), &tree_before);
}

#[test]
fn subchannel_ranges_concatenate_into_parent() {
    let mut world = World::<f32>::new(3, 3).expect("world");
    world.declare_channel(Channel::new("energy")).expect("energy");
    let com = world.declare_channel(Channel::new("com")).expect("com");
    com.add_subchannel("one").expect("one");
    com.add_subchannel("two").expect("two").set_depth(2).expect("depth");
    world.allocate().expect("allocate");

    let com = world.channel("com").expect("com");
    assert_eq!(com.range(), Some(1..4));
    assert_eq!(com.subchannel("one").and_then(Channel::range), Some(1..2));
    assert_eq!(com.subchannel("two").and_then(Channel::range), Some(2..4));
    assert_eq!(
        world.indices(&ChannelKey::subs("com", ["one", "two"])),
        world.indices(&ChannelKey::id("com"))
    );

    let view = com.read(&world).expect("read");
    assert_eq!(view.depth(), 3);
}

#[test]
fn declarations_close_after_allocation() {
    let mut world = WorldConfig::coral(4, 4).build::<f32>().expect("build");
    world.allocate().expect("allocate");
    for id in ["energy", "fresh", ""] {
        let err = world.declare_channel(Channel::new(id)).unwrap_err();
        assert_eq!(err, WorldError::AlreadyAllocated { id: id.to_string() });
    }
    let invalid = Channel::new("bad").with_data(ChannelData::new(vec![1, 1], vec![0.0_f32]));
    assert!(matches!(
        world.declare_channel(invalid),
        Err(WorldError::AlreadyAllocated { .. })
    ));
}

#[test]
fn views_alias_the_live_buffer() {
    let mut world = WorldConfig::coral(4, 3).build::<f32>().expect("build");
    world.allocate().expect("allocate");
    world
        .map_inplace("infra", |value| value + 2.0)
        .expect("map");
    let keys = [ChannelKey::from("infra"), ChannelKey::from(("com", "a"))];
    let view = world.view_many(&keys).expect("view");
    assert_eq!(view.depth(), 2);
    assert_eq!(view.get(3, 2, 0), Some(2.0));
    assert_eq!(view.get(3, 2, 1), Some(0.0));
    assert_eq!(view.get(4, 0, 0), None);
    assert_eq!(view.plane(0), Some(vec![2.0; 12]));
}

#[test]
fn errors_before_allocation() {
    let world = WorldConfig::coral(4, 3).build::<f32>().expect("build");
    assert!(matches!(world.view("energy"), Err(WorldError::NotAllocated { .. })));
    assert_eq!(world.validate_shape("energy", &[4, 3, 2]), Ok(2));
    assert!(matches!(
        world.validate_shape("energy", &[3, 4]),
        Err(WorldError::InvalidShape { .. })
    ));
    assert_eq!(world.dtype(), DType::F32);
}

#[test]
fn clear_zeroes_everything() {
    assert!(
        WorldConfig::coral(4, 4).build::<f64>().is_err(),
        "coral config is f32"
    );

    let mut config = WorldConfig::coral(4, 4);
    config.dtype = DType::F64;
    let mut world = config.build::<f64>().expect("build");
    world.allocate().expect("allocate");
    world.paint_disc("energy", 0, 0, 3, 1.0).expect("paint");
    assert!(world.stats("energy").expect("stats").sum > 0.0);
    world.clear().expect("clear");
    assert!(world.buffer().expect("buffer").iter().all(|&v| v == 0.0));
}
