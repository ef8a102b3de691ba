//! Property tests for the memory-grant and IPC syscalls.
//!
//! - alloc then unmap at any user page leaves no frame behind
//! - cross-map then unmap restores the shared frame's reference count
//! - unmap of an empty page is a no-op
//! - try-send to an environment that is not receiving changes nothing
//! - permission words are accepted exactly when well formed

use proptest::prelude::*;

use super::numbers::*;
use super::SyscallError;
use crate::env::{EnvId, EnvStatus};
use crate::kernel::tests::test_kernel;
use crate::kernel::Kernel;
use crate::mm::{PagePerm, VirtAddr, PAGE_SIZE, UTOP};

fn arb_user_page() -> impl Strategy<Value = usize> {
    (0usize..UTOP / PAGE_SIZE).prop_map(|pfn| pfn * PAGE_SIZE)
}

fn call(k: &mut Kernel, id: EnvId, num: usize, args: [usize; 5]) -> isize {
    k.env_run(id).unwrap();
    k.syscall(num, args)
}

fn rw() -> usize {
    (PagePerm::REQUIRED | PagePerm::WRITABLE).bits()
}

proptest! {
    #[test]
    fn alloc_then_unmap_frees_page(va in arb_user_page()) {
        let (mut k, _) = test_kernel(8);
        let a = k.env_create(0, 0).unwrap();
        let free = k.frames().free_frames();

        prop_assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, [0, va, rw(), 0, 0]), 0);
        let space = k.env(a).unwrap().address_space().unwrap();
        prop_assert_eq!(space.frame_refs(VirtAddr::new(va)), Some(1));

        prop_assert_eq!(call(&mut k, a, SYS_PAGE_UNMAP, [0, va, 0, 0, 0]), 0);
        let space = k.env(a).unwrap().address_space().unwrap();
        prop_assert_eq!(space.mapping_count(), 0);
        // Only the leaf table stays behind.
        prop_assert_eq!(k.frames().free_frames(), free - 1);
    }

    #[test]
    fn map_then_unmap_restores_refs(src in arb_user_page(), dst in arb_user_page()) {
        let (mut k, _) = test_kernel(16);
        let p = k.env_create(0, 0).unwrap();
        let child = EnvId::new(call(&mut k, p, SYS_EXOFORK, [0; 5]) as u32);
        prop_assert_eq!(call(&mut k, p, SYS_PAGE_ALLOC, [0, src, rw(), 0, 0]), 0);

        let child_word = child.as_u32() as usize;
        prop_assert_eq!(call(&mut k, p, SYS_PAGE_MAP, [0, src, child_word, dst, rw()]), 0);
        let refs = |k: &Kernel| k.env(p).unwrap().address_space().unwrap().frame_refs(VirtAddr::new(src));
        prop_assert_eq!(refs(&k), Some(2));

        prop_assert_eq!(call(&mut k, p, SYS_PAGE_UNMAP, [child_word, dst, 0, 0, 0]), 0);
        prop_assert_eq!(refs(&k), Some(1));
    }

    #[test]
    fn unmap_empty_page_is_noop(va in arb_user_page()) {
        let (mut k, _) = test_kernel(8);
        let a = k.env_create(0, 0).unwrap();
        let free = k.frames().free_frames();
        prop_assert_eq!(call(&mut k, a, SYS_PAGE_UNMAP, [0, va, 0, 0, 0]), 0);
        prop_assert_eq!(call(&mut k, a, SYS_PAGE_UNMAP, [0, va, 0, 0, 0]), 0);
        prop_assert_eq!(k.frames().free_frames(), free);
    }

    #[test]
    fn try_send_to_idle_target_changes_nothing(
        value in any::<u32>(),
        srcva in any::<usize>(),
        perm in 0usize..0x1000,
    ) {
        let (mut k, _) = test_kernel(16);
        let a = k.env_create(0, 0).unwrap();
        let b = k.env_create(0, 0).unwrap();
        prop_assert_eq!(call(&mut k, b, SYS_PAGE_ALLOC, [0, 0, rw(), 0, 0]), 0);

        let ipc_before = *k.env(a).unwrap().ipc();
        let free = k.frames().free_frames();
        let a_word = a.as_u32() as usize;
        let ret = call(&mut k, b, SYS_IPC_TRY_SEND, [a_word, value as usize, srcva, perm, 0]);

        prop_assert_eq!(ret, SyscallError::IpcNotRecv.as_raw());
        prop_assert_eq!(*k.env(a).unwrap().ipc(), ipc_before);
        prop_assert_eq!(k.env(a).unwrap().status(), EnvStatus::Runnable);
        prop_assert_eq!(k.env(b).unwrap().status(), EnvStatus::Runnable);
        prop_assert_eq!(k.frames().free_frames(), free);
    }

    #[test]
    fn perm_words_accepted_iff_well_formed(raw in any::<usize>()) {
        let (mut k, _) = test_kernel(8);
        let a = k.env_create(0, 0).unwrap();
        let well_formed = PagePerm::from_bits(raw).is_some_and(PagePerm::is_user_accessible);

        let ret = call(&mut k, a, SYS_PAGE_ALLOC, [0, 0, raw, 0, 0]);
        if well_formed {
            prop_assert_eq!(ret, 0);
        } else {
            prop_assert_eq!(ret, SyscallError::Inval.as_raw());
        }
    }
}
