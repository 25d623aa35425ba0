// Shared memory backend abstraction for Linux
// Uses shm_open + mmap so server and clients can rendezvous by name

use std::io;

/// Shared memory backend trait for cross-platform memory mapping
pub trait SharedMemoryBackend: Send + Sync + std::fmt::Debug {
    /// Get a pointer to the mapped memory region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the mapped region in bytes
    fn size(&self) -> usize;

    /// Get the underlying file descriptor
    fn raw_handle(&self) -> RawHandle;
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy)]
pub enum RawHandle {
    /// Unix file descriptor (Linux)
    Fd(i32),
}

/// Create a new named shared memory region with the specified size.
///
/// Fails with `AlreadyExists` when an object of that name is present. The
/// creating process owns initialization of the region contents and unlinks
/// the name when the backend is dropped.
///
/// # Arguments
/// * `name` - POSIX object name; a leading '/' is added if missing
/// * `size` - Size of the shared memory region in bytes
#[cfg(target_os = "linux")]
pub fn create_shared_memory(name: &str, size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Ok(Box::new(PosixSharedMemory::create(name, size)?))
}

/// Attach to an existing named shared memory region created by another
/// process. Never unlinks the name.
#[cfg(target_os = "linux")]
pub fn attach_shared_memory(name: &str, size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Ok(Box::new(PosixSharedMemory::attach(name, size)?))
}

#[cfg(not(target_os = "linux"))]
pub fn create_shared_memory(_name: &str, _size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn attach_shared_memory(_name: &str, _size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(target_os = "linux")]
use libc::c_void;
#[cfg(target_os = "linux")]
use std::ffi::CString;
#[cfg(target_os = "linux")]
use std::os::unix::io::RawFd;
#[cfg(target_os = "linux")]
use std::ptr::NonNull;

#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct PosixSharedMemory {
    ptr: NonNull<u8>,
    size: usize,
    fd: RawFd,
    name: CString,
    /// Whether this handle created the object and must unlink it on drop.
    owner: bool,
}

#[cfg(target_os = "linux")]
unsafe impl Send for PosixSharedMemory {}
#[cfg(target_os = "linux")]
unsafe impl Sync for PosixSharedMemory {}

#[cfg(target_os = "linux")]
impl PosixSharedMemory {
    fn object_name(name: &str) -> io::Result<CString> {
        let mut full = String::with_capacity(name.len() + 1);
        if !name.starts_with('/') {
            full.push('/');
        }
        full.push_str(name);

        CString::new(full).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("shared memory name {name:?} contains an interior NUL"),
            )
        })
    }

    /// Create, size, and map a new named region (O_CREAT | O_EXCL).
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        let c_name = Self::object_name(name)?;

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o666,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        // Set size
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(err);
        }

        // Map memory
        let ptr = match Self::map(fd, size) {
            Ok(ptr) => ptr,
            Err(err) => {
                unsafe {
                    libc::close(fd);
                    libc::shm_unlink(c_name.as_ptr());
                }
                return Err(err);
            }
        };

        Ok(Self {
            ptr,
            size,
            fd,
            name: c_name,
            owner: true,
        })
    }

    /// Map an existing named region. Fails with `NotFound` when no object
    /// of that name exists.
    pub fn attach(name: &str, size: usize) -> io::Result<Self> {
        let c_name = Self::object_name(name)?;

        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0o666) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let ptr = match Self::map(fd, size) {
            Ok(ptr) => ptr,
            Err(err) => {
                unsafe { libc::close(fd) };
                return Err(err);
            }
        };

        Ok(Self {
            ptr,
            size,
            fd,
            name: c_name,
            owner: false,
        })
    }

    fn map(fd: RawFd, size: usize) -> io::Result<NonNull<u8>> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        NonNull::new(ptr as *mut u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "mmap returned a null mapping"))
    }
}

#[cfg(target_os = "linux")]
impl Drop for PosixSharedMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut c_void, self.size);
            libc::close(self.fd);
            if self.owner {
                libc::shm_unlink(self.name.as_ptr());
            }
        }
    }
}

#[cfg(target_os = "linux")]
impl SharedMemoryBackend for PosixSharedMemory {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::Fd(self.fd)
    }
}
