//! Property tests: lookups agree with a plain map of the mappings made so far

use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::{
    config::{PAGE_SIZE, USER_SPACE_END},
    mock::{assert_well_formed, MockFrames},
    KernelPageTable,
    MapPermission,
    PhysAddr,
    UserPageTable,
    VirtAddr,
    VmError,
};

/// Pages spread over different leaf and interior tables
const PAGES: [usize; 8] = [
    0x0,
    0x1000,
    0x2000,
    0x1f_f000,
    0x20_0000,
    0x4000_0000,
    0x4000_1000,
    USER_SPACE_END - PAGE_SIZE,
];

#[derive(Debug, Clone)]
enum Op {
    Map(usize, usize),
    Unmap(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..PAGES.len(), 0x80400usize..0x80480).prop_map(|(page, ppn)| Op::Map(page, ppn)),
        (0..PAGES.len()).prop_map(Op::Unmap),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lookup_matches_model(ops in prop::collection::vec(op(), 1..40)) {
        let mut frames = MockFrames::new();
        let kernel = KernelPageTable::new(&mut frames).unwrap();
        let mut user = UserPageTable::new(&kernel, &mut frames).unwrap();
        let mut model: BTreeMap<usize, usize> = BTreeMap::new();
        let perm = MapPermission::R | MapPermission::U;

        for op in ops {
            match op {
                Op::Map(page, ppn) => {
                    let va = PAGES[page];
                    let res = user.map(VirtAddr(va), PhysAddr(ppn * PAGE_SIZE), perm, &mut frames);
                    if model.contains_key(&va) {
                        prop_assert_eq!(res, Err(VmError::Remap));
                    } else {
                        prop_assert_eq!(res, Ok(()));
                        model.insert(va, ppn * PAGE_SIZE);
                    }
                }
                Op::Unmap(page) => {
                    let va = PAGES[page];
                    let res = user.unmap(VirtAddr(va), &mut frames);
                    if model.remove(&va).is_some() {
                        prop_assert_eq!(res, Ok(()));
                    } else {
                        prop_assert_eq!(res, Err(VmError::NotMapped));
                    }
                }
            }
            for va in PAGES {
                prop_assert_eq!(user.lookup(VirtAddr(va)), model.get(&va).map(|pa| PhysAddr(*pa)));
            }
        }
        assert_well_formed(user.page_table());
        user.destroy(&mut frames);
    }
}
