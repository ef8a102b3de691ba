//! Syscall scenario tests, driven through the full trap path.

use alloc::sync::Arc;
use alloc::vec::Vec;

use super::numbers::*;
use super::SyscallError;
use crate::env::{EnvId, EnvStatus};
use crate::exception::Trapframe;
use crate::kernel::tests::{test_kernel, Probes};
use crate::kernel::Kernel;
use crate::mm::{AddressSpace, PagePerm, VirtAddr, UTOP};

/// Receiver's destination page.
const X: usize = 0x0060_0000;
/// Sender's source page.
const Y: usize = 0x0040_0000;

fn rw() -> PagePerm {
    PagePerm::REQUIRED | PagePerm::WRITABLE
}

fn word(id: EnvId) -> usize {
    id.as_u32() as usize
}

/// Run `id` and have it issue a syscall.
fn call(k: &mut Kernel, id: EnvId, num: usize, args: &[usize]) -> isize {
    let mut words = [0; 5];
    words[..args.len()].copy_from_slice(args);
    k.env_run(id).unwrap();
    k.syscall(num, words)
}

fn space(k: &Kernel, id: EnvId) -> &AddressSpace {
    k.env(id).unwrap().address_space().unwrap()
}

/// Kernel with two runnable top-level environments.
fn setup(max_frames: usize) -> (Kernel, Probes, EnvId, EnvId) {
    let (mut k, probes) = test_kernel(max_frames);
    let a = k.env_create(0x80_0000, 0).unwrap();
    let b = k.env_create(0x80_0000, 0).unwrap();
    (k, probes, a, b)
}

// ---------------------------------------------------------------------------
// IPC rendezvous
// ---------------------------------------------------------------------------

#[test]
fn test_ipc_value_only() {
    let (mut k, _, a, b) = setup(64);

    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[UTOP]), 0);
    assert_eq!(k.env(a).unwrap().status(), EnvStatus::NotRunnable);
    assert!(k.env(a).unwrap().ipc().receiving);

    assert_eq!(call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 42, UTOP, 0]), 0);

    let env = k.env(a).unwrap();
    assert_eq!(env.status(), EnvStatus::Runnable);
    assert!(!env.ipc().receiving);
    assert_eq!(env.inbox().value, 42);
    assert_eq!(env.inbox().from, b);
    assert_eq!(env.inbox().perm, PagePerm::empty());
    assert_eq!(env.trapframe().return_value(), 0);
    assert_eq!(space(&k, a).mapping_count(), 0);
}

#[test]
fn test_ipc_page_transfer() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, b, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    space(&k, b).copy_out(VirtAddr::new(Y), b"hello", rw()).unwrap();

    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[X]), 0);
    assert_eq!(call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 7, Y, rw().bits()]), 0);

    let theirs = space(&k, b).lookup(VirtAddr::new(Y)).unwrap();
    let ours = space(&k, a).lookup(VirtAddr::new(X)).unwrap();
    assert!(Arc::ptr_eq(theirs.frame(), ours.frame()));
    assert_eq!(ours.perm(), rw());
    assert_eq!(space(&k, a).frame_refs(VirtAddr::new(X)), Some(2));
    assert_eq!(k.env(a).unwrap().inbox().perm, rw());
    assert_eq!(k.env(a).unwrap().inbox().value, 7);

    let mut back = [0u8; 5];
    space(&k, a).copy_in(VirtAddr::new(X), &mut back, PagePerm::REQUIRED).unwrap();
    assert_eq!(&back, b"hello");
}

#[test]
fn test_ipc_page_grant_never_adds_write() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, b, SYS_PAGE_ALLOC, &[0, Y, PagePerm::REQUIRED.bits()]), 0);
    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[X]), 0);

    let escalate = call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 1, Y, rw().bits()]);
    assert_eq!(escalate, SyscallError::Inval.as_raw());
    assert!(k.env(a).unwrap().ipc().receiving);

    let read_only = PagePerm::REQUIRED.bits();
    assert_eq!(call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 1, Y, read_only]), 0);
    assert_eq!(
        space(&k, a).lookup(VirtAddr::new(X)).unwrap().perm(),
        PagePerm::REQUIRED
    );
}

#[test]
fn test_ipc_misaligned_source_has_no_effect() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, b, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[X]), 0);
    let before = *k.env(a).unwrap().ipc();

    let ret = call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 7, Y + 8, rw().bits()]);
    assert_eq!(ret, SyscallError::Inval.as_raw());
    assert_eq!(*k.env(a).unwrap().ipc(), before);
    assert!(k.env(a).unwrap().ipc().receiving);
    assert_eq!(k.env(a).unwrap().status(), EnvStatus::NotRunnable);
}

#[test]
fn test_ipc_unmapped_source_rejected() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[X]), 0);
    let ret = call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 7, Y, rw().bits()]);
    assert_eq!(ret, SyscallError::Inval.as_raw());
    assert!(k.env(a).unwrap().ipc().receiving);
}

#[test]
fn test_ipc_no_page_when_either_side_declines() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, b, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, 0, PagePerm::REQUIRED.bits()]), 0);
    let mapped = |k: &Kernel| -> Vec<VirtAddr> {
        space(k, a).mappings().map(|(va, _)| va).collect()
    };
    let before = mapped(&k);
    assert_eq!(before, [VirtAddr::new(0)]);

    // Receiver declines.
    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[UTOP]), 0);
    assert_eq!(call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 1, Y, rw().bits()]), 0);
    assert_eq!(k.env(a).unwrap().inbox().perm, PagePerm::empty());
    assert_eq!(mapped(&k), before);
    assert_eq!(space(&k, b).frame_refs(VirtAddr::new(Y)), Some(1));

    // Sender declines; its permission word is ignored.
    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[X]), 0);
    assert_eq!(call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 2, UTOP, 0xFFF]), 0);
    assert_eq!(k.env(a).unwrap().inbox().perm, PagePerm::empty());
    assert_eq!(mapped(&k), before);
}

#[test]
fn test_ipc_first_sender_wins() {
    let (mut k, _, a, b) = setup(64);
    let c = k.env_create(0, 0).unwrap();

    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[UTOP]), 0);
    assert_eq!(call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 1, UTOP, 0]), 0);
    let lost = call(&mut k, c, SYS_IPC_TRY_SEND, &[word(a), 2, UTOP, 0]);
    assert_eq!(lost, SyscallError::IpcNotRecv.as_raw());
    assert_eq!(k.env(a).unwrap().inbox().from, b);
    assert_eq!(k.env(a).unwrap().inbox().value, 1);

    // A new receive is a new episode.
    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[UTOP]), 0);
    assert_eq!(call(&mut k, c, SYS_IPC_TRY_SEND, &[word(a), 2, UTOP, 0]), 0);
    assert_eq!(k.env(a).unwrap().inbox().from, c);
}

#[test]
fn test_ipc_send_to_idle_target() {
    let (mut k, _, a, b) = setup(64);
    let before = *k.env(a).unwrap().ipc();
    let ret = call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 9, UTOP, 0]);
    assert_eq!(ret, SyscallError::IpcNotRecv.as_raw());
    assert_eq!(*k.env(a).unwrap().ipc(), before);
    assert_eq!(k.env(a).unwrap().status(), EnvStatus::Runnable);
    assert_eq!(k.env(b).unwrap().status(), EnvStatus::Runnable);
}

#[test]
fn test_ipc_send_to_stale_id() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, a, SYS_ENV_DESTROY, &[0]), 0);
    let ret = call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 9, UTOP, 0]);
    assert_eq!(ret, SyscallError::BadEnv.as_raw());
}

#[test]
fn test_ipc_table_exhaustion_leaves_receiver_waiting() {
    // Two roots, then B's page and its leaf table: nothing left for A's table.
    let (mut k, _, a, b) = setup(4);
    assert_eq!(call(&mut k, b, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    assert_eq!(k.frames().free_frames(), 0);

    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[X]), 0);
    let ret = call(&mut k, b, SYS_IPC_TRY_SEND, &[word(a), 7, Y, rw().bits()]);
    assert_eq!(ret, SyscallError::NoMem.as_raw());
    assert!(k.env(a).unwrap().ipc().receiving);
    assert_eq!(space(&k, b).frame_refs(VirtAddr::new(Y)), Some(1));
}

#[test]
fn test_ipc_recv_misaligned_destination() {
    let (mut k, _, a, _) = setup(64);
    let ret = call(&mut k, a, SYS_IPC_RECV, &[X + 1]);
    assert_eq!(ret, SyscallError::Inval.as_raw());
    assert!(!k.env(a).unwrap().ipc().receiving);
    assert_eq!(k.env(a).unwrap().status(), EnvStatus::Runnable);
}

#[test]
fn test_receiver_stays_blocked_without_sender() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, a, SYS_IPC_RECV, &[UTOP]), 0);
    assert_eq!(k.current(), Some(b));

    for _ in 0..32 {
        assert_eq!(k.syscall(SYS_YIELD, [0; 5]), 0);
        assert_eq!(k.current(), Some(b));
        let env = k.env(a).unwrap();
        assert_eq!(env.status(), EnvStatus::NotRunnable);
        assert!(env.ipc().receiving);
    }
}

// ---------------------------------------------------------------------------
// Memory grants
// ---------------------------------------------------------------------------

#[test]
fn test_page_alloc_requires_present() {
    let (mut k, _, a, _) = setup(64);
    let free = k.frames().free_frames();
    let no_present = (PagePerm::USER | PagePerm::WRITABLE).bits();
    let ret = call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, no_present]);
    assert_eq!(ret, SyscallError::Inval.as_raw());
    assert_eq!(k.frames().free_frames(), free);
}

#[test]
fn test_page_alloc_argument_checks() {
    let (mut k, _, a, b) = setup(64);
    let free = k.frames().free_frames();
    let inval = SyscallError::Inval.as_raw();
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y + 1, rw().bits()]), inval);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, UTOP, rw().bits()]), inval);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits() | 0x800]), inval);
    // B is not A's child.
    let bad = call(&mut k, a, SYS_PAGE_ALLOC, &[word(b), Y, rw().bits()]);
    assert_eq!(bad, SyscallError::BadEnv.as_raw());
    assert_eq!(k.frames().free_frames(), free);
}

#[test]
fn test_page_alloc_replaces_and_zeroes() {
    let (mut k, _, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    space(&k, a).copy_out(VirtAddr::new(Y), b"secret", rw()).unwrap();
    let free = k.frames().free_frames();

    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    assert_eq!(k.frames().free_frames(), free);
    let mut back = [0xAAu8; 6];
    space(&k, a).copy_in(VirtAddr::new(Y), &mut back, PagePerm::REQUIRED).unwrap();
    assert_eq!(back, [0; 6]);
}

#[test]
fn test_page_alloc_out_of_memory_releases_frame() {
    // Root of A plus one page: the leaf table cannot be allocated.
    let (mut k, _) = test_kernel(2);
    let a = k.env_create(0, 0).unwrap();
    let ret = call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]);
    assert_eq!(ret, SyscallError::NoMem.as_raw());
    assert_eq!(k.frames().free_frames(), 1);
    assert_eq!(space(&k, a).mapping_count(), 0);
}

#[test]
fn test_page_map_shares_frame() {
    let (mut k, _, p, _) = setup(64);
    let child = call(&mut k, p, SYS_EXOFORK, &[]);
    let child = EnvId::new(child as u32);

    assert_eq!(call(&mut k, p, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    let ro = PagePerm::REQUIRED.bits();
    assert_eq!(call(&mut k, p, SYS_PAGE_MAP, &[0, Y, word(child), X, ro]), 0);
    assert_eq!(space(&k, p).frame_refs(VirtAddr::new(Y)), Some(2));
    assert_eq!(
        space(&k, child).lookup(VirtAddr::new(X)).unwrap().perm(),
        PagePerm::REQUIRED
    );

    // Child's read-only view cannot be re-shared writable.
    let escalate = call(&mut k, p, SYS_PAGE_MAP, &[word(child), X, 0, X, rw().bits()]);
    assert_eq!(escalate, SyscallError::Inval.as_raw());
    assert!(space(&k, p).lookup(VirtAddr::new(X)).is_none());

    assert_eq!(call(&mut k, p, SYS_PAGE_UNMAP, &[word(child), X]), 0);
    assert_eq!(space(&k, p).frame_refs(VirtAddr::new(Y)), Some(1));
}

#[test]
fn test_page_map_argument_checks() {
    let (mut k, _, a, b) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    let inval = SyscallError::Inval.as_raw();
    let perm = rw().bits();

    assert_eq!(call(&mut k, a, SYS_PAGE_MAP, &[0, X, 0, Y + 0x1000, perm]), inval);
    assert_eq!(call(&mut k, a, SYS_PAGE_MAP, &[0, Y, 0, UTOP, perm]), inval);
    assert_eq!(call(&mut k, a, SYS_PAGE_MAP, &[0, Y + 4, 0, X, perm]), inval);
    assert_eq!(call(&mut k, a, SYS_PAGE_MAP, &[0, Y, 0, X, 0x1]), inval);
    assert_eq!(
        call(&mut k, a, SYS_PAGE_MAP, &[0, Y, word(b), X, perm]),
        SyscallError::BadEnv.as_raw()
    );
    assert_eq!(space(&k, a).mapping_count(), 1);
}

#[test]
fn test_page_unmap_idempotent() {
    let (mut k, _, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    let free = k.frames().free_frames();

    assert_eq!(call(&mut k, a, SYS_PAGE_UNMAP, &[0, Y]), 0);
    assert_eq!(k.frames().free_frames(), free + 1);
    assert_eq!(call(&mut k, a, SYS_PAGE_UNMAP, &[0, Y]), 0);
    assert_eq!(k.frames().free_frames(), free + 1);
    assert_eq!(
        call(&mut k, a, SYS_PAGE_UNMAP, &[0, Y + 1]),
        SyscallError::Inval.as_raw()
    );
}

// ---------------------------------------------------------------------------
// Environment control
// ---------------------------------------------------------------------------

#[test]
fn test_exofork_copies_registers() {
    let (mut k, _) = test_kernel(64);
    let p = k.env_create(0x80_0000, 0).unwrap();
    k.envs.get_mut(p).unwrap().tf.gpr[19] = 0x1919;

    let ret = call(&mut k, p, SYS_EXOFORK, &[]);
    assert!(ret > 0);
    let child = EnvId::new(ret as u32);

    let parent_tf = *k.env(p).unwrap().trapframe();
    let child_env = k.env(child).unwrap();
    assert_eq!(child_env.status(), EnvStatus::NotRunnable);
    assert_eq!(child_env.parent_id(), p);
    assert_eq!(parent_tf.return_value(), ret);

    let mut expected = parent_tf;
    expected.set_return(0);
    assert_eq!(*child_env.trapframe(), expected);
    assert_eq!(child_env.trapframe().gpr[19], 0x1919);

    // Once runnable, the scheduler picks the child after the parent.
    let runnable = EnvStatus::Runnable as usize;
    assert_eq!(call(&mut k, p, SYS_ENV_SET_STATUS, &[word(child), runnable]), 0);
    k.env_run(p).unwrap();
    assert_eq!(k.schedule(), Some(child));
}

#[test]
fn test_exofork_table_full() {
    let (mut k, _) = test_kernel(64);
    let p = k.env_create(0, 0).unwrap();
    for _ in 1..k.envs().capacity() {
        assert!(call(&mut k, p, SYS_EXOFORK, &[]) > 0);
    }
    let ret = call(&mut k, p, SYS_EXOFORK, &[]);
    assert_eq!(ret, SyscallError::NoFreeEnv.as_raw());
}

#[test]
fn test_set_status_rules() {
    let (mut k, _, p, stranger) = setup(64);
    let child = EnvId::new(call(&mut k, p, SYS_EXOFORK, &[]) as u32);
    let inval = SyscallError::Inval.as_raw();

    assert_eq!(call(&mut k, p, SYS_ENV_SET_STATUS, &[word(child), 0]), inval);
    assert_eq!(call(&mut k, p, SYS_ENV_SET_STATUS, &[word(child), 3]), inval);
    assert_eq!(
        call(&mut k, stranger, SYS_ENV_SET_STATUS, &[word(child), 1]),
        SyscallError::BadEnv.as_raw()
    );
    assert_eq!(k.env(child).unwrap().status(), EnvStatus::NotRunnable);
}

#[test]
fn test_runnable_cancels_receive() {
    let (mut k, _, p, _) = setup(64);
    let child = EnvId::new(call(&mut k, p, SYS_EXOFORK, &[]) as u32);
    assert_eq!(call(&mut k, p, SYS_ENV_SET_STATUS, &[word(child), 1]), 0);
    assert_eq!(call(&mut k, child, SYS_IPC_RECV, &[X]), 0);

    assert_eq!(call(&mut k, p, SYS_ENV_SET_STATUS, &[word(child), 1]), 0);
    let env = k.env(child).unwrap();
    assert_eq!(env.status(), EnvStatus::Runnable);
    assert!(!env.ipc().receiving);
    assert_eq!(env.ipc().dst_va, None);
}

#[test]
fn test_destroy_child_and_self() {
    let (mut k, _, p, other) = setup(64);
    let free = k.frames().free_frames();
    let child = EnvId::new(call(&mut k, p, SYS_EXOFORK, &[]) as u32);
    assert_eq!(call(&mut k, p, SYS_PAGE_ALLOC, &[word(child), Y, rw().bits()]), 0);

    assert_eq!(
        call(&mut k, other, SYS_ENV_DESTROY, &[word(child)]),
        SyscallError::BadEnv.as_raw()
    );
    assert_eq!(call(&mut k, p, SYS_ENV_DESTROY, &[word(child)]), 0);
    assert!(k.env(child).is_none());
    assert_eq!(k.frames().free_frames(), free);

    assert_eq!(call(&mut k, p, SYS_ENV_DESTROY, &[0]), 0);
    assert!(k.env(p).is_none());
    assert_eq!(k.current(), Some(other));
}

#[test]
fn test_set_trapframe_sanitizes() {
    let (mut k, _, p, _) = setup(64);
    let child = EnvId::new(call(&mut k, p, SYS_EXOFORK, &[]) as u32);
    assert_eq!(call(&mut k, p, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);

    let mut tf = Trapframe::new_user(0x80_1000, 0xEEBF_E000);
    tf.spsr = 0x3C5;
    space(&k, p).copy_out(VirtAddr::new(Y), &tf.to_bytes(), rw()).unwrap();

    assert_eq!(call(&mut k, p, SYS_ENV_SET_TRAPFRAME, &[word(child), Y]), 0);
    let installed = k.env(child).unwrap().trapframe();
    assert_eq!(installed.elr, 0x80_1000);
    assert_eq!(installed.sp, 0xEEBF_E000);
    assert_eq!(installed.spsr, 0x300);
}

#[test]
fn test_set_trapframe_on_self_returns_zero_in_x0() {
    let (mut k, _, p, _) = setup(64);
    assert_eq!(call(&mut k, p, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);

    let mut tf = Trapframe::new_user(0x80_1000, 0xEEBF_E000);
    tf.gpr[0] = 0x5555;
    tf.gpr[1] = 0x6666;
    space(&k, p).copy_out(VirtAddr::new(Y), &tf.to_bytes(), rw()).unwrap();

    assert_eq!(call(&mut k, p, SYS_ENV_SET_TRAPFRAME, &[0, Y]), 0);
    let installed = k.env(p).unwrap().trapframe();
    assert_eq!(installed.elr, 0x80_1000);
    assert_eq!(installed.gpr[1], 0x6666);
    // The syscall result lands in x0 after the new frame is installed.
    assert_eq!(installed.return_value(), 0);
}

#[test]
fn test_set_trapframe_bad_pointer_destroys_caller() {
    let (mut k, _, p, _) = setup(64);
    let child = EnvId::new(call(&mut k, p, SYS_EXOFORK, &[]) as u32);
    let before = *k.env(child).unwrap().trapframe();

    let ret = call(&mut k, p, SYS_ENV_SET_TRAPFRAME, &[word(child), Y]);
    assert_eq!(ret, SyscallError::Fault.as_raw());
    assert!(k.env(p).is_none());
    assert_eq!(*k.env(child).unwrap().trapframe(), before);
}

#[test]
fn test_set_pgfault_upcall() {
    let (mut k, _, p, stranger) = setup(64);
    let child = EnvId::new(call(&mut k, p, SYS_EXOFORK, &[]) as u32);
    assert_eq!(call(&mut k, p, SYS_ENV_SET_PGFAULT_UPCALL, &[word(child), 0x80_2000]), 0);
    assert_eq!(k.env(child).unwrap().pgfault_upcall(), 0x80_2000);
    assert_eq!(
        call(&mut k, stranger, SYS_ENV_SET_PGFAULT_UPCALL, &[word(child), 0]),
        SyscallError::BadEnv.as_raw()
    );
}

#[test]
fn test_getenvid_and_unknown() {
    let (mut k, _, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_GETENVID, &[]), a.as_u32() as isize);
    assert_eq!(call(&mut k, a, 99, &[]), SyscallError::Inval.as_raw());
    assert_eq!(k.env(a).unwrap().trapframe().return_value(), SyscallError::Inval.as_raw());
}

// ---------------------------------------------------------------------------
// Console, clock and network
// ---------------------------------------------------------------------------

#[test]
fn test_cputs_and_cgetc() {
    let (mut k, probes, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    space(&k, a).copy_out(VirtAddr::new(Y), b"hello, world", rw()).unwrap();

    assert_eq!(call(&mut k, a, SYS_CPUTS, &[Y, 5]), 0);
    assert_eq!(probes.console.output(), b"hello");

    probes.console.push_input(b"q");
    assert_eq!(call(&mut k, a, SYS_CGETC, &[]), b'q' as isize);
    assert_eq!(call(&mut k, a, SYS_CGETC, &[]), 0);
}

#[test]
fn test_cputs_bad_pointer_destroys_caller() {
    let (mut k, probes, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    // Runs one byte past the mapped page.
    assert_eq!(
        call(&mut k, a, SYS_CPUTS, &[Y + 4000, 97]),
        SyscallError::Fault.as_raw()
    );
    assert!(k.env(a).is_none());
    assert!(probes.console.output().is_empty());
}

#[test]
fn test_time_msec() {
    let (mut k, probes, a, _) = setup(64);
    probes.clock.advance(1500);
    assert_eq!(call(&mut k, a, SYS_TIME_MSEC, &[]), 1500);
}

#[test]
fn test_net_send() {
    let (mut k, probes, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    space(&k, a).copy_out(VirtAddr::new(Y), b"frame", rw()).unwrap();

    assert_eq!(call(&mut k, a, SYS_NET_SEND, &[Y, 5]), 0);
    assert_eq!(probes.nic.complete_tx().as_deref(), Some(&b"frame"[..]));

    let too_long = crate::drivers::MAX_FRAME_LEN + 1;
    assert_eq!(
        call(&mut k, a, SYS_NET_SEND, &[Y, too_long]),
        SyscallError::Inval.as_raw()
    );
}

#[test]
fn test_net_send_ring_full_is_retry() {
    let (mut k, _, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);
    for _ in 0..crate::drivers::net::RING_SIZE {
        assert_eq!(call(&mut k, a, SYS_NET_SEND, &[Y, 60]), 0);
    }
    assert_eq!(call(&mut k, a, SYS_NET_SEND, &[Y, 60]), SyscallError::Retry.as_raw());
}

#[test]
fn test_net_recv() {
    let (mut k, probes, a, _) = setup(64);
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, rw().bits()]), 0);

    assert_eq!(call(&mut k, a, SYS_NET_RECV, &[Y, 64]), 0);

    probes.nic.begin_delivery();
    assert_eq!(call(&mut k, a, SYS_NET_RECV, &[Y, 64]), SyscallError::Retry.as_raw());
    probes.nic.deliver(b"ping");

    assert_eq!(call(&mut k, a, SYS_NET_RECV, &[Y, 2]), 2);
    let mut back = [0u8; 4];
    space(&k, a).copy_in(VirtAddr::new(Y), &mut back, PagePerm::REQUIRED).unwrap();
    assert_eq!(&back, b"pi\0\0");
}

#[test]
fn test_net_recv_into_read_only_page_destroys_caller() {
    let (mut k, probes, a, _) = setup(64);
    let ro = PagePerm::REQUIRED.bits();
    assert_eq!(call(&mut k, a, SYS_PAGE_ALLOC, &[0, Y, ro]), 0);
    probes.nic.deliver(b"ping");
    assert_eq!(call(&mut k, a, SYS_NET_RECV, &[Y, 64]), SyscallError::Fault.as_raw());
    assert!(k.env(a).is_none());
}
